use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const DEFAULT_AUTHORIZATION_TYPE: &str = "Bearer";

/// A string that is never printed by `Debug`.
///
/// Serialization keeps the real value so that a configuration survives being
/// re-encoded.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct BasicAuth {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Authorization {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}

/// TLS material used when talking to a target or a discovery API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct TlsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    pub fn is_empty(&self) -> bool {
        self == &TlsConfig::default()
    }
}

/// HTTP client settings. In the YAML these keys are inlined into the section
/// that owns the client (a scrape job or a discovery config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<Authorization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token_file: Option<String>,
    #[serde(skip_serializing_if = "TlsConfig::is_empty")]
    pub tls_config: TlsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<Url>,
    pub follow_redirects: bool,
    pub enable_http2: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            basic_auth: None,
            authorization: None,
            bearer_token: None,
            bearer_token_file: None,
            tls_config: TlsConfig::default(),
            proxy_url: None,
            follow_redirects: true,
            enable_http2: true,
        }
    }
}

impl HttpClientConfig {
    /// Checks the mutually exclusive authentication settings and folds the
    /// legacy bearer token settings into `authorization`.
    pub(crate) fn validate(&mut self) -> Result<(), Error> {
        let has_bearer = self.bearer_token.is_some() || self.bearer_token_file.is_some();

        if self.bearer_token.is_some() && self.bearer_token_file.is_some() {
            return Err(http_error(
                "at most one of bearer_token & bearer_token_file must be configured",
            ));
        }
        if self.basic_auth.is_some() && has_bearer {
            return Err(http_error(
                "at most one of basic_auth, bearer_token & bearer_token_file must be configured",
            ));
        }
        if let Some(basic_auth) = &self.basic_auth {
            if basic_auth.password.is_some() && basic_auth.password_file.is_some() {
                return Err(http_error(
                    "at most one of basic_auth password & password_file must be configured",
                ));
            }
        }

        match self.authorization.as_mut() {
            Some(authorization) => {
                if has_bearer {
                    return Err(http_error(
                        "authorization is not compatible with bearer_token & bearer_token_file",
                    ));
                }
                if self.basic_auth.is_some() {
                    return Err(http_error(
                        "at most one of basic_auth & authorization must be configured",
                    ));
                }
                if authorization.credentials.is_some() && authorization.credentials_file.is_some()
                {
                    return Err(http_error(
                        "at most one of authorization credentials & credentials_file must be configured",
                    ));
                }
                let kind = authorization.kind.trim();
                if kind.eq_ignore_ascii_case("basic") {
                    return Err(http_error(
                        r#"authorization type cannot be set to "basic", use "basic_auth" instead"#,
                    ));
                }
                authorization.kind = if kind.is_empty() {
                    DEFAULT_AUTHORIZATION_TYPE.to_string()
                } else {
                    kind.to_string()
                };
            }
            None if has_bearer => {
                self.authorization = Some(Authorization {
                    kind: DEFAULT_AUTHORIZATION_TYPE.to_string(),
                    credentials: self.bearer_token.take(),
                    credentials_file: self.bearer_token_file.take(),
                });
            }
            None => {}
        }

        Ok(())
    }
}

fn http_error(message: &str) -> Error {
    Error::HttpClient(message.to_string())
}
