//! Typed model of the Prometheus configuration file.
//!
//! The schema follows Prometheus' own YAML layout and strictness: every
//! section rejects keys it does not know about, and [`Config::load`] applies
//! the same defaults and semantic checks Prometheus applies when it reads its
//! configuration file.

mod config;
mod discovery;
mod error;
mod http;
mod relabel;
mod targetgroup;

pub use config::{
    AlertingConfig, AlertmanagerConfig, Config, GlobalConfig, RemoteReadConfig,
    RemoteWriteConfig, ScrapeConfig, Scheme, DEFAULT_EVALUATION_INTERVAL, DEFAULT_METRICS_PATH,
    DEFAULT_SCRAPE_INTERVAL, DEFAULT_SCRAPE_TIMEOUT,
};
pub use discovery::{
    FileSdConfig, HttpSdConfig, KubernetesSdConfig, NamespaceDiscovery, Role, SelectorConfig,
    ServiceDiscoveryConfig,
};
pub use error::Error;
pub use http::{Authorization, BasicAuth, HttpClientConfig, Secret, TlsConfig};
pub use relabel::{Action, RelabelConfig};
pub use targetgroup::{is_valid_label_name, TargetGroup};

use std::collections::BTreeMap;

/// Sections with inlined HTTP client settings collect their leftover keys;
/// any leftover is an unknown field.
pub(crate) fn reject_unknown_fields(
    unknown: &BTreeMap<String, serde_yaml::Value>,
    kind: &'static str,
) -> Result<(), Error> {
    match unknown.keys().next() {
        Some(field) => Err(Error::UnknownField {
            field: field.clone(),
            kind,
        }),
        None => Ok(()),
    }
}
