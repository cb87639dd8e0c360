use crate::DecodeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// A generic configuration tree, as the pipeline hands it to a component.
///
/// Decoding into a typed configuration is strict: the target types use
/// `deny_unknown_fields`, so a key they do not declare is an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfMap(Mapping);

impl ConfMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, DecodeError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_yaml::from_str(text).map_err(DecodeError::Receiver)?;
        Self::from_value("", value)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| DecodeError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_yaml_str(&text)
    }

    /// The sub-tree below `key`. A missing or null key is an empty tree.
    pub fn sub(&self, key: &str) -> Result<Self, DecodeError> {
        match self.0.get(key) {
            Some(value) => Self::from_value(key, value.clone()),
            None => Ok(Self::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(self.0.clone()))
    }

    fn from_value(key: &str, value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(mapping) => Ok(Self(mapping)),
            _ => Err(DecodeError::NotAMapping(key.to_string())),
        }
    }
}

impl From<Mapping> for ConfMap {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

impl TryFrom<Value> for ConfMap {
    type Error = DecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value("", value)
    }
}

/// Raw capture of a sub-tree that belongs to another decoder.
///
/// The host configuration declares the key with this type so that the strict
/// first decoding pass accepts it. The content is never interpreted by the
/// host; it is re-serialized and handed to the decoder that owns it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawSection(Option<Value>);

impl RawSection {
    pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Self, serde_yaml::Error> {
        serde_yaml::to_value(value).map(|value| Self(Some(value)))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            None | Some(Value::Null) => true,
            Some(Value::Mapping(mapping)) => mapping.is_empty(),
            Some(_) => false,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        self.0.unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn sub_trees() {
        let conf = ConfMap::from_yaml_str(
            "receivers:\n  prometheus:\n    buffer_count: 3\n  otlp:\n",
        )
        .unwrap();

        let receivers = conf.sub("receivers").unwrap();
        assert!(!receivers.sub("prometheus").unwrap().is_empty());
        assert!(receivers.get("otlp").is_some_and(Value::is_null));
        assert!(receivers.get("missing").is_none());
        assert!(receivers.sub("otlp").unwrap().is_empty());
        assert!(receivers.sub("missing").unwrap().is_empty());
    }

    #[rstest]
    #[case("- a\n- b\n")]
    #[case("just a string")]
    fn root_must_be_a_mapping(#[case] input: &str) {
        let err = ConfMap::from_yaml_str(input).expect_err("expected an error");
        assert!(matches!(err, DecodeError::NotAMapping(_)));
    }

    #[test]
    fn empty_document_is_an_empty_tree() {
        assert_eq!(ConfMap::from_yaml_str("").unwrap(), ConfMap::new());
        assert!(ConfMap::new().is_empty());
    }

    #[rstest]
    #[case("", true)]
    #[case("config:\n", true)]
    #[case("config: {}\n", true)]
    #[case("config:\n  scrape_configs: []\n", false)]
    #[case("config: text\n", false)]
    fn raw_section_emptiness(#[case] input: &str, #[case] empty: bool) {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default)]
            config: RawSection,
        }

        let input = if input.is_empty() { "{}" } else { input };
        let holder: Holder = serde_yaml::from_str(input).unwrap();
        assert_eq!(holder.config.is_empty(), empty);
    }
}
