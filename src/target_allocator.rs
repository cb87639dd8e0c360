use crate::confmap::RawSection;
use crate::{AllocatorConfigError, DecodeError};
use promconfig::HttpSdConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// The HTTP SD block requires a URL, but the allocator client fills in the
/// real one at runtime.
const PLACEHOLDER_URL: &str = "http://placeholder";
const URL_KEY: &str = "url";

/// Settings for receiving scrape targets from a target allocator instead of
/// (or in addition to) the static Prometheus configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct TargetAllocator {
    pub endpoint: String,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub collector_id: String,

    /// The decoded `http_sd_config` key. Its `url` is a placeholder.
    #[serde(skip)]
    pub http_sd_config: Option<HttpSdConfig>,

    /// Raw `http_sd_config` sub-tree, decoded by the Prometheus schema.
    #[serde(rename = "http_sd_config", skip_serializing_if = "RawSection::is_empty")]
    raw_http_sd_config: RawSection,
}

impl Default for TargetAllocator {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            interval: DEFAULT_INTERVAL,
            collector_id: String::new(),
            http_sd_config: None,
            raw_http_sd_config: RawSection::default(),
        }
    }
}

impl TargetAllocator {
    pub fn new(endpoint: impl Into<String>, collector_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collector_id: collector_id.into(),
            ..Self::default()
        }
    }

    /// Checks the endpoint and the collector id.
    ///
    /// A collector id containing `${` still holds an unexpanded environment
    /// variable, which means the templating step upstream was skipped.
    pub fn validate(&self) -> Result<(), AllocatorConfigError> {
        if parse_request_uri(&self.endpoint).is_none() {
            return Err(AllocatorConfigError::Endpoint(self.endpoint.clone()));
        }
        if self.collector_id.is_empty() || self.collector_id.contains("${") {
            return Err(AllocatorConfigError::CollectorId(self.collector_id.clone()));
        }
        Ok(())
    }

    pub(crate) fn unmarshal_http_sd_config(&mut self) -> Result<(), DecodeError> {
        if self.raw_http_sd_config.is_empty() {
            return Ok(());
        }

        let mut section = self.raw_http_sd_config.clone().into_value();
        if let Value::Mapping(mapping) = &mut section {
            mapping.insert(URL_KEY.into(), PLACEHOLDER_URL.into());
        }

        let text = serde_yaml::to_string(&section).map_err(DecodeError::Marshal)?;
        let http_sd_config =
            HttpSdConfig::load(&text).map_err(DecodeError::TargetAllocatorHttpSd)?;
        debug!(
            refresh_interval = ?http_sd_config.refresh_interval,
            "decoded target allocator http_sd_config"
        );
        self.http_sd_config = Some(http_sd_config);
        Ok(())
    }

    /// The placeholder URL is dropped again so it never ends up in an encoded
    /// configuration.
    pub(crate) fn marshal_http_sd_config(&mut self) -> Result<(), DecodeError> {
        let Some(http_sd_config) = &self.http_sd_config else {
            return Ok(());
        };

        let mut section = serde_yaml::to_value(http_sd_config).map_err(DecodeError::Marshal)?;
        if let Value::Mapping(mapping) = &mut section {
            mapping.remove(URL_KEY);
        }
        self.raw_http_sd_config = RawSection::encode(&section).map_err(DecodeError::Marshal)?;
        Ok(())
    }
}

/// A URI in one of the forms an HTTP request line accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestUri {
    /// A URI with a scheme. Rootless forms such as `localhost:8080` (scheme
    /// `localhost`) or `mailto:ops@example.com` are kept opaque.
    Absolute(Url),
    /// An origin-form path like `/api/targets`.
    Path(String),
}

/// Parses the input as a URI a request can be sent to.
///
/// The input is either an absolute URI or a path starting with `/`. Anything
/// else, control characters, malformed percent escapes and invalid hosts are
/// rejected.
pub fn parse_request_uri(input: &str) -> Option<RequestUri> {
    if input.bytes().any(|b| b.is_ascii_control()) {
        return None;
    }
    if input.starts_with('/') {
        return has_valid_escapes(input).then(|| RequestUri::Path(input.to_string()));
    }
    Url::parse(input).ok().map(RequestUri::Absolute)
}

fn has_valid_escapes(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfMap;
    use crate::Config;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:8080")]
    #[case("https://target-allocator.monitoring.svc:443")]
    #[case("http://127.0.0.1:80/api")]
    #[case("localhost:8080")]
    #[case("/api/targets")]
    #[case("/api/targets%20v2")]
    #[case("mailto:ops@example.com")]
    fn valid_endpoints(#[case] endpoint: &str) {
        TargetAllocator::new(endpoint, "col-1")
            .validate()
            .expect("expected no error");
    }

    #[rstest]
    #[case("not a url")]
    #[case("")]
    #[case("relative/path")]
    #[case("127.0.0.1:8080")]
    #[case("/api/%zz")]
    #[case("/api\ttargets")]
    #[case("http://exa mple.com")]
    fn invalid_endpoints(#[case] endpoint: &str) {
        let err = TargetAllocator::new(endpoint, "col-1")
            .validate()
            .expect_err("expected a error");
        assert_eq!(err, AllocatorConfigError::Endpoint(endpoint.to_string()));
        assert!(err.to_string().ends_with(endpoint));
    }

    #[test]
    fn request_uri_forms() {
        let absolute = parse_request_uri("localhost:8080");
        assert!(matches!(absolute, Some(RequestUri::Absolute(url)) if url.scheme() == "localhost"));
        assert_eq!(
            parse_request_uri("/api/targets"),
            Some(RequestUri::Path("/api/targets".to_string()))
        );
    }

    #[rstest]
    #[case("")]
    #[case("${POD_NAME}")]
    #[case("collector-${env:HOSTNAME}")]
    fn invalid_collector_ids(#[case] collector_id: &str) {
        let err = TargetAllocator::new("http://localhost:8080", collector_id)
            .validate()
            .expect_err("expected a error");
        assert_eq!(err, AllocatorConfigError::CollectorId(collector_id.to_string()));
    }

    fn unmarshal(yaml: &str) -> Result<Config, DecodeError> {
        Config::unmarshal(&ConfMap::from_yaml_str(yaml).unwrap())
    }

    #[test]
    fn decodes_http_sd_config_with_placeholder_url() {
        let config = unmarshal(
            r#"
target_allocator:
  endpoint: http://localhost:8080
  interval: 1m
  collector_id: collector-1
  http_sd_config:
    refresh_interval: 2m
    basic_auth:
      username: scraper
      password: hunter2
"#,
        )
        .unwrap();

        let target_allocator = config.target_allocator.expect("target allocator");
        assert_eq!(target_allocator.interval, Duration::from_secs(60));

        let http_sd_config = target_allocator.http_sd_config.expect("http_sd_config");
        assert_eq!(http_sd_config.url.as_str(), "http://placeholder/");
        assert_eq!(http_sd_config.refresh_interval, Duration::from_secs(120));
        let basic_auth = http_sd_config.http_client_config.basic_auth.unwrap();
        assert_eq!(basic_auth.username, "scraper");
        assert_eq!(basic_auth.password.unwrap().expose(), "hunter2");
    }

    #[test]
    fn configured_http_sd_url_is_replaced_by_placeholder() {
        let config = unmarshal(
            r#"
target_allocator:
  endpoint: http://ta:80
  collector_id: c
  http_sd_config:
    url: http://user
"#,
        )
        .unwrap();

        let http_sd_config = config.target_allocator.unwrap().http_sd_config.unwrap();
        assert_eq!(http_sd_config.url.as_str(), "http://placeholder/");
    }

    #[test]
    fn defaults_without_http_sd_config() {
        let config = unmarshal("target_allocator:\n  endpoint: http://ta:80\n").unwrap();
        let target_allocator = config.target_allocator.unwrap();
        assert_eq!(target_allocator.interval, DEFAULT_INTERVAL);
        assert!(target_allocator.http_sd_config.is_none());
    }

    #[test]
    fn http_sd_config_is_decoded_without_prometheus_config() {
        let config = unmarshal(
            "target_allocator:\n  endpoint: http://ta:80\n  collector_id: c\n  http_sd_config:\n    refresh_interval: 10s\n",
        )
        .unwrap();
        assert!(config.prometheus_config.is_none());
        assert!(config.target_allocator.unwrap().http_sd_config.is_some());
    }

    #[rstest]
    #[case("    refresh: 10s\n")]
    #[case("    refresh_interval: soon\n")]
    fn invalid_http_sd_config(#[case] section: &str) {
        let yaml = format!(
            "target_allocator:\n  endpoint: http://ta:80\n  collector_id: c\n  http_sd_config:\n{section}"
        );
        let err = unmarshal(&yaml).expect_err("expected an error");
        assert!(matches!(err, DecodeError::TargetAllocatorHttpSd(_)), "{err}");
    }

    #[test]
    fn unknown_target_allocator_key_is_rejected() {
        let err =
            unmarshal("target_allocator:\n  endpoint: http://ta:80\n  port: 80\n").unwrap_err();
        assert!(matches!(err, DecodeError::Receiver(_)));
    }
}
