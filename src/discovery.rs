//! Checks for file based service discovery.
//!
//! Every pattern of a `file_sd_configs` block is expanded and every matching
//! file is parsed the same way Prometheus parses it at runtime, so that a
//! broken discovery file fails startup instead of silently producing no
//! targets.
//!
//! The check is advisory and runs once: a file can still change or disappear
//! between validation and the first scrape. This is not re-checked later.

use crate::{DiscoveryFileError, SdFileError};
use promconfig::{FileSdConfig, TargetGroup};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Validates every pattern of a `file_sd_configs` block of the given job.
pub fn check_file_sd(job: &str, config: &FileSdConfig) -> Result<(), DiscoveryFileError> {
    for pattern in &config.files {
        let paths = expand_pattern(job, pattern)?;
        if paths.is_empty() {
            return Err(DiscoveryFileError::NoMatch {
                job: job.to_string(),
                pattern: pattern.clone(),
            });
        }
        debug!(job, %pattern, matches = paths.len(), "expanded file_sd pattern");

        for path in paths {
            if let Err(error) = check_sd_file(&path) {
                return Err(DiscoveryFileError::File {
                    job: job.to_string(),
                    path,
                    error,
                });
            }
        }
    }
    Ok(())
}

/// Parses a single discovery file and checks that it holds no nil or empty
/// target groups and no invalid label names.
pub fn check_sd_file(path: &Path) -> Result<(), SdFileError> {
    parse_target_groups(path).map(|_| ())
}

/// Reads the target groups of a discovery file.
///
/// `.json` files are decoded leniently (unknown keys are ignored), `.yml` and
/// `.yaml` files strictly. The extension is matched case-insensitively. A file
/// that is empty or holds only `null` has no groups.
pub fn parse_target_groups(path: &Path) -> Result<Vec<TargetGroup>, SdFileError> {
    let content = fs::read(path).map_err(SdFileError::Read)?;
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned())
        .unwrap_or_default();

    let groups: Vec<Option<TargetGroup>> = match extension.to_ascii_lowercase().as_str() {
        "json" => serde_json::from_slice::<Option<Vec<Option<JsonTargetGroup>>>>(&content)
            .map_err(SdFileError::Json)?
            .unwrap_or_default()
            .into_iter()
            .map(|group| group.map(Into::into))
            .collect(),
        "yml" | "yaml" if is_blank(&content) => Vec::new(),
        "yml" | "yaml" => serde_yaml::from_slice::<Option<Vec<Option<TargetGroup>>>>(&content)
            .map_err(SdFileError::Yaml)?
            .unwrap_or_default(),
        _ if extension.is_empty() => return Err(SdFileError::Extension(String::new())),
        _ => return Err(SdFileError::Extension(format!(".{extension}"))),
    };

    // A bad label name fails the file ahead of any nil or empty group.
    for (index, group) in groups.iter().enumerate() {
        if let Some(name) = group.as_ref().and_then(TargetGroup::invalid_label_name) {
            return Err(SdFileError::LabelName {
                index,
                name: name.to_string(),
            });
        }
    }

    for (index, group) in groups.iter().enumerate() {
        match group {
            None => return Err(SdFileError::NilGroup(index)),
            Some(group) if group.is_empty() => return Err(SdFileError::EmptyGroup(index)),
            Some(_) => {}
        }
    }

    trace!(path = %path.display(), groups = groups.len(), "parsed SD file");
    Ok(groups.into_iter().flatten().collect())
}

/// Expands a glob pattern. Paths that can't be read while walking the
/// directories are skipped, like an unreadable directory is by a shell.
fn expand_pattern(job: &str, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryFileError> {
    let entries = glob::glob(pattern).map_err(|error| DiscoveryFileError::Pattern {
        job: job.to_string(),
        pattern: pattern.to_string(),
        error,
    })?;

    let paths = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(?err, %pattern, "skipping unreadable path");
                None
            }
        })
        .collect();
    Ok(paths)
}

fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct JsonTargetGroup {
    targets: Vec<String>,
    labels: BTreeMap<String, String>,
}

impl From<JsonTargetGroup> for TargetGroup {
    fn from(group: JsonTargetGroup) -> Self {
        TargetGroup {
            targets: group.targets,
            labels: group.labels,
        }
    }
}
