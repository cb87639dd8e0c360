use crate::http::HttpClientConfig;
use crate::targetgroup::TargetGroup;
use crate::{reject_unknown_fields, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_FILE_SD_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_HTTP_SD_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// One service discovery mechanism configured on a scrape job.
///
/// The set of mechanisms is closed: any other `*_sd_configs` key is rejected
/// as an unknown field while decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceDiscoveryConfig<'a> {
    Static(&'a TargetGroup),
    File(&'a FileSdConfig),
    Kubernetes(&'a KubernetesSdConfig),
    Http(&'a HttpSdConfig),
}

impl ServiceDiscoveryConfig<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceDiscoveryConfig::Static(_) => "static",
            ServiceDiscoveryConfig::File(_) => "file",
            ServiceDiscoveryConfig::Kubernetes(_) => "kubernetes",
            ServiceDiscoveryConfig::Http(_) => "http",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileSdConfig {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_file_sd_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl FileSdConfig {
    pub fn new<I, T>(files: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            refresh_interval: DEFAULT_FILE_SD_REFRESH_INTERVAL,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.files.is_empty() {
            return Err(Error::NoFileSdPaths);
        }
        if let Some(path) = self.files.iter().find(|path| !is_valid_file_sd_path(path)) {
            return Err(Error::FileSdPath(path.clone()));
        }
        Ok(())
    }
}

/// Wildcards are only allowed in the last path segment, and the extension is
/// `json`, `yml` or `yaml` in either all lower or all upper case.
fn is_valid_file_sd_path(path: &str) -> bool {
    let Some((stem, extension)) = path.rsplit_once('.') else {
        return false;
    };
    if !matches!(extension, "json" | "yml" | "yaml" | "JSON" | "YML" | "YAML") {
        return false;
    }
    match stem.split_once('*') {
        Some((_, rest)) => !rest.contains('/'),
        None => true,
    }
}

fn default_file_sd_refresh_interval() -> Duration {
    DEFAULT_FILE_SD_REFRESH_INTERVAL
}

/// The Kubernetes object kind a discovery config watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Endpoints,
    EndpointSlice,
    Service,
    Pod,
    Node,
    Ingress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct NamespaceDiscovery {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub own_namespace: bool,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    pub role: Role,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KubernetesSdConfig {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceDiscovery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorConfig>,
    #[serde(flatten)]
    pub http_client_config: HttpClientConfig,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

impl KubernetesSdConfig {
    pub(crate) fn validate(&mut self) -> Result<(), Error> {
        reject_unknown_fields(&self.unknown, "kubernetes.SDConfig")?;
        if self.api_server.is_some() && self.kubeconfig_file.is_some() {
            return Err(Error::KubernetesApiServer);
        }
        self.http_client_config.validate()
    }
}

/// HTTP based service discovery.
///
/// The target allocator reuses this block with a URL that is only known at
/// runtime, see [`HttpSdConfig::load`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpSdConfig {
    pub url: Url,
    #[serde(default = "default_http_sd_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(flatten)]
    pub http_client_config: HttpClientConfig,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

impl HttpSdConfig {
    /// Strictly decodes a standalone `http_sd_config` block.
    pub fn load(text: &str) -> Result<Self, Error> {
        let mut config: HttpSdConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        debug!(url = %config.url, "loaded http_sd_config");
        Ok(config)
    }

    pub(crate) fn validate(&mut self) -> Result<(), Error> {
        reject_unknown_fields(&self.unknown, "http.SDConfig")?;
        if self.url.scheme() != "http" && self.url.scheme() != "https" {
            return Err(Error::HttpSdScheme);
        }
        if self.url.host_str().map_or(true, str::is_empty) {
            return Err(Error::HttpSdHost);
        }
        self.http_client_config.validate()
    }
}

fn default_http_sd_refresh_interval() -> Duration {
    DEFAULT_HTTP_SD_REFRESH_INTERVAL
}
