use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A set of targets sharing a common label set.
///
/// This is the element type of both `static_configs` and the files read by
/// file based service discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct TargetGroup {
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl TargetGroup {
    pub fn new<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            labels: BTreeMap::new(),
        }
    }

    /// A group without targets and without labels carries no information.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.labels.is_empty()
    }

    /// The first label name Prometheus would refuse, if any.
    pub fn invalid_label_name(&self) -> Option<&str> {
        self.labels
            .keys()
            .map(String::as_str)
            .find(|name| !is_valid_label_name(name))
    }
}

/// Label names match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_yaml::from_str::<TargetGroup>("targets: []\nlabelz: {}\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let group: TargetGroup = serde_yaml::from_str("labels:\n  env: prod\n").unwrap();
        assert!(group.targets.is_empty());
        assert!(!group.is_empty());
        assert!(TargetGroup::default().is_empty());
    }

    #[rstest]
    #[case("env", true)]
    #[case("_private", true)]
    #[case("__meta_kubernetes_pod_name", true)]
    #[case("Zone2", true)]
    #[case("", false)]
    #[case("2zone", false)]
    #[case("not a label", false)]
    #[case("app.kubernetes.io/name", false)]
    #[case("région", false)]
    fn label_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_label_name(name), valid);
    }

    #[test]
    fn reports_first_invalid_label_name() {
        let group: TargetGroup =
            serde_yaml::from_str("labels:\n  env: prod\n  bad-name: x\n").unwrap();
        assert_eq!(group.invalid_label_name(), Some("bad-name"));
        assert_eq!(TargetGroup::new(["a:80"]).invalid_label_name(), None);
    }
}
