//! Configuration for a Prometheus scrape receiver.
//!
//! A receiver's configuration section is decoded with [`Config::unmarshal`]
//! and checked with [`Config::validate`] before any scraping starts:
//!
//! ```no_run
//! use prometheus_receiver::{ConfMap, Config};
//!
//! let conf = ConfMap::from_yaml_file("receiver.yaml")?;
//! let config = Config::load(&conf)?;
//! # Ok::<(), prometheus_receiver::Error>(())
//! ```
//!
//! The Prometheus configuration under the `config` key is decoded by
//! [`promconfig`], which follows Prometheus' own rules for that file. On top
//! of that the receiver rejects the Prometheus features it can't support
//! (remote write/read, rules and alerting) and checks the files and endpoints
//! the configuration refers to.

mod config;
mod confmap;
pub mod discovery;
mod error;
mod target_allocator;
mod validate;

pub use config::Config;
pub use confmap::{ConfMap, RawSection};
pub use error::{
    AllocatorConfigError, DecodeError, DiscoveryFileError, Error, PolicyViolationError,
    SdFileError, UnsupportedFeatureError, ValidationError,
};
pub use target_allocator::{parse_request_uri, RequestUri, TargetAllocator};

pub use promconfig;
