use thiserror::Error;

/// Errors produced while decoding a Prometheus configuration.
///
/// Syntax problems (including unknown keys and type mismatches) surface as
/// [`Error::Yaml`]. Everything else is a semantic check that runs after the
/// YAML has been decoded.
#[derive(Debug, Error)]
pub enum Error {
    /// The YAML text could not be decoded into the schema.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// A key that is not part of the schema was found in an inlined section.
    #[error("field {field} not found in type {kind}")]
    UnknownField { field: String, kind: &'static str },

    #[error("global scrape timeout ({timeout}) greater than scrape interval ({interval})")]
    GlobalScrapeTimeout { timeout: String, interval: String },

    #[error("job_name is empty")]
    EmptyJobName,

    #[error("found multiple scrape configs with job name {0:?}")]
    DuplicateJobName(String),

    #[error("scrape timeout greater than scrape interval for scrape config with job name {0:?}")]
    ScrapeTimeout(String),

    /// A semantic check failed inside a specific scrape job.
    #[error("invalid scrape config for job {job:?}: {error}")]
    ScrapeConfig { job: String, error: Box<Error> },

    #[error("{0}")]
    Relabel(String),

    #[error("{0}")]
    HttpClient(String),

    #[error("file service discovery config must contain at least one path name")]
    NoFileSdPaths,

    #[error("path name {0:?} is not valid for file discovery")]
    FileSdPath(String),

    #[error("{0:?} is not a valid label name")]
    LabelName(String),

    #[error("URL scheme must be 'http' or 'https'")]
    HttpSdScheme,

    #[error("host is missing in URL")]
    HttpSdHost,

    #[error("cannot use 'kubeconfig_file' and 'api_server' simultaneously")]
    KubernetesApiServer,
}

impl Error {
    pub(crate) fn in_job(self, job: &str) -> Self {
        Error::ScrapeConfig {
            job: job.to_string(),
            error: Box::new(self),
        }
    }
}
