use crate::confmap::{ConfMap, RawSection};
use crate::target_allocator::TargetAllocator;
use crate::{DecodeError, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// This struct represents the configuration of the Prometheus receiver.
///
/// The `config` key holds a complete Prometheus configuration. Prometheus owns
/// that schema, so it is not decoded together with the other keys: the first
/// pass only captures it as a [`RawSection`], and [`Config::unmarshal`] then
/// hands it to [`promconfig::Config::load`].
///
/// A `Config` is validated once with [`Config::validate`] and is read-only
/// from then on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The decoded `config` key, if it was present and non-empty.
    #[serde(skip)]
    pub prometheus_config: Option<promconfig::Config>,

    #[serde(with = "humantime_serde")]
    pub buffer_period: Duration,
    pub buffer_count: usize,

    /// Retrieve the start time of all counters from the
    /// `process_start_time_seconds` metric. Only correct if every counter on
    /// the endpoint started after the process did.
    pub use_start_time_metric: bool,
    pub start_time_metric_regex: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_allocator: Option<TargetAllocator>,

    /// Raw `config` sub-tree, kept only so the strict first pass accepts the
    /// key. Use [`Config::prometheus_config`] instead.
    #[serde(rename = "config", skip_serializing_if = "RawSection::is_empty")]
    raw_prometheus_config: RawSection,
}

impl Config {
    /// Decode and validate in one go.
    pub fn load(conf: &ConfMap) -> Result<Self, Error> {
        let config = Self::unmarshal(conf)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode the receiver's configuration section.
    ///
    /// A missing or empty `config` key leaves [`Config::prometheus_config`]
    /// unset. Any problem in the Prometheus configuration or in the target
    /// allocator's `http_sd_config` is fatal.
    pub fn unmarshal(conf: &ConfMap) -> Result<Self, DecodeError> {
        let mut config: Config = conf.unmarshal().map_err(DecodeError::Receiver)?;

        if !config.raw_prometheus_config.is_empty() {
            let text = serde_yaml::to_string(&config.raw_prometheus_config)
                .map_err(DecodeError::Marshal)?;
            let prometheus_config =
                promconfig::Config::load(&text).map_err(DecodeError::PrometheusConfig)?;
            debug!(
                scrape_configs = prometheus_config.scrape_configs.len(),
                "decoded prometheus config"
            );
            config.prometheus_config = Some(prometheus_config);
        }

        if let Some(target_allocator) = config.target_allocator.as_mut() {
            target_allocator.unmarshal_http_sd_config()?;
        }

        Ok(config)
    }

    /// Encode the configuration back into a tree that [`Config::unmarshal`]
    /// accepts.
    pub fn marshal(&self) -> Result<ConfMap, DecodeError> {
        let mut encoded = self.clone();
        if let Some(prometheus_config) = &self.prometheus_config {
            encoded.raw_prometheus_config =
                RawSection::encode(prometheus_config).map_err(DecodeError::Marshal)?;
        }
        if let Some(target_allocator) = encoded.target_allocator.as_mut() {
            target_allocator.marshal_http_sd_config()?;
        }

        let value = serde_yaml::to_value(&encoded).map_err(DecodeError::Marshal)?;
        ConfMap::try_from(value)
    }
}
