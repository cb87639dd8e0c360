use crate::discovery::{FileSdConfig, HttpSdConfig, KubernetesSdConfig, ServiceDiscoveryConfig};
use crate::http::HttpClientConfig;
use crate::relabel::RelabelConfig;
use crate::targetgroup::TargetGroup;
use crate::{reject_unknown_fields, Error};
use humantime::format_duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_EVALUATION_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// A Prometheus configuration file.
///
/// Only [`Config::load`] produces a fully initialized value: it applies the
/// global defaults to every scrape job and runs the schema's own semantic
/// checks. Deserializing with serde alone skips both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub global: GlobalConfig,
    #[serde(skip_serializing_if = "AlertingConfig::is_empty")]
    pub alerting: AlertingConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scrape_configs: Vec<ScrapeConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_write: Vec<RemoteWriteConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_read: Vec<RemoteReadConfig>,
}

impl Config {
    /// Strictly decodes Prometheus YAML. Unknown keys and type mismatches are
    /// errors, as are the semantic problems Prometheus itself rejects.
    pub fn load(text: &str) -> Result<Self, Error> {
        let mut config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.init()?;
        debug!(
            scrape_configs = config.scrape_configs.len(),
            "loaded prometheus config"
        );
        Ok(config)
    }

    fn init(&mut self) -> Result<(), Error> {
        self.global.validate()?;

        for relabel in &self.alerting.alert_relabel_configs {
            relabel.validate()?;
        }
        for remote_write in &self.remote_write {
            for relabel in &remote_write.write_relabel_configs {
                relabel.validate()?;
            }
        }

        let mut job_names = HashSet::new();
        for scrape_config in &mut self.scrape_configs {
            scrape_config.init(&self.global)?;
            if !job_names.insert(scrape_config.job_name.clone()) {
                return Err(Error::DuplicateJobName(scrape_config.job_name.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct GlobalConfig {
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub scrape_interval: Option<Duration>,
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub scrape_timeout: Option<Duration>,
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub evaluation_interval: Option<Duration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub external_labels: BTreeMap<String, String>,
}

impl GlobalConfig {
    pub fn scrape_interval(&self) -> Duration {
        self.scrape_interval.unwrap_or(DEFAULT_SCRAPE_INTERVAL)
    }

    /// An unset timeout never exceeds the interval: it falls back to the
    /// default timeout, capped at the interval.
    pub fn scrape_timeout(&self) -> Duration {
        self.scrape_timeout
            .unwrap_or_else(|| DEFAULT_SCRAPE_TIMEOUT.min(self.scrape_interval()))
    }

    pub fn evaluation_interval(&self) -> Duration {
        self.evaluation_interval.unwrap_or(DEFAULT_EVALUATION_INTERVAL)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.scrape_timeout() > self.scrape_interval() {
            return Err(Error::GlobalScrapeTimeout {
                timeout: format_duration(self.scrape_timeout()).to_string(),
                interval: format_duration(self.scrape_interval()).to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AlertingConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alert_relabel_configs: Vec<RelabelConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alertmanagers: Vec<AlertmanagerConfig>,
}

impl AlertingConfig {
    pub fn is_empty(&self) -> bool {
        self.alert_relabel_configs.is_empty() && self.alertmanagers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AlertmanagerConfig {
    pub scheme: Scheme,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub static_configs: Vec<TargetGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relabel_configs: Vec<RelabelConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteWriteConfig {
    pub url: Url,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_relabel_configs: Vec<RelabelConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteReadConfig {
    pub url: Url,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_matchers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_recent: bool,
}

/// A single scrape job.
///
/// The HTTP client settings are inlined into the job in the YAML, so this
/// type can't use `deny_unknown_fields`; leftover keys are collected and
/// rejected by [`Config::load`] instead.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub honor_labels: bool,
    #[serde(default = "default_true")]
    pub honor_timestamps: bool,

    /// Always set after [`Config::load`], inherited from `global` if absent.
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scrape_interval: Option<Duration>,

    /// Always set after [`Config::load`], inherited from `global` if absent.
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scrape_timeout: Option<Duration>,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub sample_limit: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub target_limit: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub label_limit: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relabel_configs: Vec<RelabelConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_relabel_configs: Vec<RelabelConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_configs: Vec<TargetGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_sd_configs: Vec<FileSdConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_sd_configs: Vec<KubernetesSdConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_sd_configs: Vec<HttpSdConfig>,

    #[serde(flatten)]
    pub http_client_config: HttpClientConfig,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

impl ScrapeConfig {
    /// All discovery mechanisms of this job, grouped by kind in a fixed
    /// order: static, file, kubernetes, http.
    pub fn service_discovery_configs(&self) -> impl Iterator<Item = ServiceDiscoveryConfig<'_>> {
        let statics = self.static_configs.iter().map(ServiceDiscoveryConfig::Static);
        let files = self.file_sd_configs.iter().map(ServiceDiscoveryConfig::File);
        let kubernetes = self
            .kubernetes_sd_configs
            .iter()
            .map(ServiceDiscoveryConfig::Kubernetes);
        let http = self.http_sd_configs.iter().map(ServiceDiscoveryConfig::Http);

        statics.chain(files).chain(kubernetes).chain(http)
    }

    fn init(&mut self, global: &GlobalConfig) -> Result<(), Error> {
        if self.job_name.is_empty() {
            return Err(Error::EmptyJobName);
        }
        let job = self.job_name.clone();

        reject_unknown_fields(&self.unknown, "config.ScrapeConfig")
            .map_err(|err| err.in_job(&job))?;

        let interval = *self.scrape_interval.get_or_insert(global.scrape_interval());
        let timeout = *self.scrape_timeout.get_or_insert_with(|| {
            let global_timeout = global.scrape_timeout();
            if global_timeout > interval {
                interval
            } else {
                global_timeout
            }
        });
        if timeout > interval {
            return Err(Error::ScrapeTimeout(job));
        }

        self.http_client_config
            .validate()
            .map_err(|err| err.in_job(&job))?;

        for relabel in self.relabel_configs.iter().chain(&self.metric_relabel_configs) {
            relabel.validate().map_err(|err| err.in_job(&job))?;
        }

        for group in &self.static_configs {
            if let Some(name) = group.invalid_label_name() {
                return Err(Error::LabelName(name.to_string()).in_job(&job));
            }
        }
        for file_sd in &self.file_sd_configs {
            file_sd.validate().map_err(|err| err.in_job(&job))?;
        }
        for kubernetes_sd in &mut self.kubernetes_sd_configs {
            kubernetes_sd.validate().map_err(|err| err.in_job(&job))?;
        }
        for http_sd in &mut self.http_sd_configs {
            http_sd.validate().map_err(|err| err.in_job(&job))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
