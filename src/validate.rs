use crate::discovery::check_file_sd;
use crate::{Config, PolicyViolationError, UnsupportedFeatureError, ValidationError};
use promconfig::{HttpClientConfig, ScrapeConfig, ServiceDiscoveryConfig, TlsConfig};
use std::fs;
use tracing::debug;

/// Relabeling this label renames the metric, which the receiver can't follow.
const METRIC_NAME_LABEL: &str = "__name__";

impl Config {
    /// Checks that the receiver can run with this configuration.
    ///
    /// Checks run in a fixed order and stop at the first failure, except for
    /// the unsupported feature scan which reports every offending feature at
    /// once. Validation only reads the configuration (and the filesystem), so
    /// running it again on a valid configuration succeeds again.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_scrape_configs = self
            .prometheus_config
            .as_ref()
            .map_or(false, |config| !config.scrape_configs.is_empty());
        if !has_scrape_configs && self.target_allocator.is_none() {
            return Err(ValidationError::NoScrapeConfigs);
        }

        if let Some(prometheus_config) = &self.prometheus_config {
            let features = unsupported_features(prometheus_config);
            if !features.is_empty() {
                return Err(UnsupportedFeatureError { features }.into());
            }

            for scrape_config in &prometheus_config.scrape_configs {
                validate_scrape_config(scrape_config)?;
            }
        }

        if let Some(target_allocator) = &self.target_allocator {
            target_allocator.validate()?;
        }

        debug!("prometheus receiver config is valid");
        Ok(())
    }
}

/// Prometheus features the receiver rejects, sorted.
fn unsupported_features(config: &promconfig::Config) -> Vec<&'static str> {
    let mut features = Vec::with_capacity(5);
    if !config.remote_write.is_empty() {
        features.push("remote_write");
    }
    if !config.remote_read.is_empty() {
        features.push("remote_read");
    }
    if !config.rule_files.is_empty() {
        features.push("rule_files");
    }
    if !config.alerting.alert_relabel_configs.is_empty() {
        features.push("alert_config.relabel_configs");
    }
    if !config.alerting.alertmanagers.is_empty() {
        features.push("alert_config.alertmanagers");
    }
    features.sort_unstable();
    features
}

fn validate_scrape_config(scrape_config: &ScrapeConfig) -> Result<(), ValidationError> {
    let job = scrape_config.job_name.as_str();
    debug!(job, "validating scrape config");

    if scrape_config
        .metric_relabel_configs
        .iter()
        .any(|relabel| relabel.target_label == METRIC_NAME_LABEL)
    {
        return Err(PolicyViolationError::RenamingDisallowed {
            job: job.to_string(),
        }
        .into());
    }

    check_http_client_config(job, &scrape_config.http_client_config)?;

    for service_discovery in scrape_config.service_discovery_configs() {
        match service_discovery {
            ServiceDiscoveryConfig::Kubernetes(kubernetes) => {
                check_tls_config(job, &kubernetes.http_client_config.tls_config)?;
            }
            ServiceDiscoveryConfig::File(file) => check_file_sd(job, file)?,
            ServiceDiscoveryConfig::Static(_) | ServiceDiscoveryConfig::Http(_) => {}
        }
    }

    Ok(())
}

fn check_http_client_config(
    job: &str,
    config: &HttpClientConfig,
) -> Result<(), PolicyViolationError> {
    if let Some(authorization) = &config.authorization {
        if let Some(credentials_file) = &authorization.credentials_file {
            check_file(job, "authorization credentials file", credentials_file)?;
        }
    }
    if let Some(basic_auth) = &config.basic_auth {
        if let Some(password_file) = &basic_auth.password_file {
            check_file(job, "basic auth password file", password_file)?;
        }
    }
    check_tls_config(job, &config.tls_config)
}

fn check_tls_config(job: &str, tls_config: &TlsConfig) -> Result<(), PolicyViolationError> {
    check_file(job, "client cert file", &tls_config.cert_file)?;
    check_file(job, "client key file", &tls_config.key_file)?;

    match (tls_config.cert_file.is_empty(), tls_config.key_file.is_empty()) {
        (false, true) => Err(PolicyViolationError::CertWithoutKey {
            job: job.to_string(),
            cert_file: tls_config.cert_file.clone(),
        }),
        (true, false) => Err(PolicyViolationError::KeyWithoutCert {
            job: job.to_string(),
            key_file: tls_config.key_file.clone(),
        }),
        _ => Ok(()),
    }
}

/// An empty path means the setting is not used.
fn check_file(job: &str, kind: &'static str, path: &str) -> Result<(), PolicyViolationError> {
    if path.is_empty() {
        return Ok(());
    }
    fs::metadata(path)
        .map(|_| ())
        .map_err(|error| PolicyViolationError::MissingFile {
            job: job.to_string(),
            kind,
            path: path.to_string(),
            error,
        })
}
