use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Either half of [`Config::load`](crate::Config::load) failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The configuration tree, or one of the sub-trees decoded by the Prometheus
/// schema, could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("prometheus receiver failed to parse config: {0}")]
    Receiver(serde_yaml::Error),

    #[error("prometheus receiver failed to marshal config to yaml: {0}")]
    Marshal(serde_yaml::Error),

    #[error("prometheus receiver failed to unmarshal yaml to prometheus config: {0}")]
    PrometheusConfig(promconfig::Error),

    #[error(
        "prometheus receiver failed to unmarshal yaml to target_allocator http_sd_config: {0}"
    )]
    TargetAllocatorHttpSd(promconfig::Error),

    #[error("configuration section {0:?} must be a mapping")]
    NotAMapping(String),

    #[error("unable to read configuration file {path:?}: {error}")]
    Read { path: PathBuf, error: io::Error },
}

/// A decoded configuration that the receiver refuses to run with.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no Prometheus scrape_configs or target_allocator set")]
    NoScrapeConfigs,
    #[error(transparent)]
    UnsupportedFeatures(#[from] UnsupportedFeatureError),
    #[error(transparent)]
    Policy(#[from] PolicyViolationError),
    #[error(transparent)]
    DiscoveryFile(#[from] DiscoveryFileError),
    #[error(transparent)]
    TargetAllocator(#[from] AllocatorConfigError),
}

/// Prometheus features the receiver cannot honor. The names are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported features:\n\t{}", .features.join("\n\t"))]
pub struct UnsupportedFeatureError {
    pub features: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum PolicyViolationError {
    #[error(
        "error validating scrapeconfig for job {job}: \
         metric renaming using metric_relabel_configs is disallowed"
    )]
    RenamingDisallowed { job: String },

    #[error("error checking {kind} {path:?} in scrape job {job:?}: {error}")]
    MissingFile {
        job: String,
        kind: &'static str,
        path: String,
        error: io::Error,
    },

    #[error(
        "client cert file {cert_file:?} specified without client key file in scrape job {job:?}"
    )]
    CertWithoutKey { job: String, cert_file: String },

    #[error(
        "client key file {key_file:?} specified without client cert file in scrape job {job:?}"
    )]
    KeyWithoutCert { job: String, key_file: String },
}

#[derive(Debug, Error)]
pub enum DiscoveryFileError {
    #[error("invalid file_sd pattern {pattern:?} in scrape job {job:?}: {error}")]
    Pattern {
        job: String,
        pattern: String,
        error: glob::PatternError,
    },

    #[error("file {pattern:?} for file_sd in scrape job {job:?} does not exist")]
    NoMatch { job: String, pattern: String },

    #[error("checking SD file {path:?} for scrape job {job:?}: {error}")]
    File {
        job: String,
        path: PathBuf,
        error: SdFileError,
    },
}

/// Problems with a single file read by file based service discovery.
#[derive(Debug, Error)]
pub enum SdFileError {
    #[error("unable to read file: {0}")]
    Read(io::Error),
    #[error("error in unmarshaling json file extension: {0}")]
    Json(serde_json::Error),
    #[error("error in unmarshaling yaml file extension: {0}")]
    Yaml(serde_yaml::Error),
    #[error("invalid file extension: {0:?}")]
    Extension(String),
    #[error("nil target group item found (index {0})")]
    NilGroup(usize),
    #[error("empty target group item found (index {0})")]
    EmptyGroup(usize),
    #[error("{name:?} is not a valid label name (index {index})")]
    LabelName { index: usize, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocatorConfigError {
    #[error("TargetAllocator endpoint is not valid: {0}")]
    Endpoint(String),
    #[error("CollectorID is not a valid ID: {0:?}")]
    CollectorId(String),
}
