//! Processor options
//!
//! Options reach the writers either as the raw key-value map a build tool
//! passes to the processor or as a `[processing]` table in a TOML file.

use crate::error::{WriterError, WriterResult};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Key of the option that drops recorded injection points of configuration properties
pub const OMIT_CONFPROP_INJECTION_POINTS: &str = "beanforge.processing.omit.confprop.injectpoints";

/// Options read once when a build session starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Do not record injection-point metadata for configuration property values
    pub omit_confprop_inject_points: bool,
    /// Every option as handed over, including unknown keys
    #[serde(skip)]
    pub raw: FxHashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    processing: WriterOptions,
}

impl WriterOptions {
    /// Options from the processor's key-value map
    pub fn from_map(map: &FxHashMap<String, String>) -> WriterResult<Self> {
        let omit = match map.get(OMIT_CONFPROP_INJECTION_POINTS).map(String::as_str) {
            None => false,
            Some(value) => parse_flag(OMIT_CONFPROP_INJECTION_POINTS, value)?,
        };
        Ok(Self {
            omit_confprop_inject_points: omit,
            raw: map.clone(),
        })
    }

    /// Options from the `[processing]` table of a TOML document
    pub fn from_toml_str(source: &str) -> WriterResult<Self> {
        let file: OptionsFile = toml::from_str(source).map_err(|e| WriterError::Options {
            message: e.to_string(),
        })?;
        let mut options = file.processing;
        if options.omit_confprop_inject_points {
            options
                .raw
                .insert(OMIT_CONFPROP_INJECTION_POINTS.to_string(), "true".to_string());
        }
        Ok(options)
    }

    /// Whether injection points of configuration property values are recorded
    pub fn keep_confprop_inject_points(&self) -> bool {
        !self.omit_confprop_inject_points
    }

    /// Raw option value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }
}

fn parse_flag(key: &str, value: &str) -> WriterResult<bool> {
    match value.trim() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        other => Err(WriterError::Options {
            message: format!("expected true or false for {}, got '{}'", key, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_map() {
        let mut map = FxHashMap::default();
        map.insert(OMIT_CONFPROP_INJECTION_POINTS.to_string(), "true".to_string());
        map.insert("other".to_string(), "x".to_string());
        let options = WriterOptions::from_map(&map).unwrap();
        assert!(options.omit_confprop_inject_points);
        assert!(!options.keep_confprop_inject_points());
        assert_eq!(options.get("other"), Some("x"));
    }

    #[test]
    fn test_missing_key_keeps_injection_points() {
        let options = WriterOptions::from_map(&FxHashMap::default()).unwrap();
        assert!(options.keep_confprop_inject_points());
    }

    #[test]
    fn test_invalid_flag() {
        let mut map = FxHashMap::default();
        map.insert(OMIT_CONFPROP_INJECTION_POINTS.to_string(), "yes".to_string());
        let err = WriterOptions::from_map(&map).unwrap_err();
        assert!(matches!(err, WriterError::Options { .. }));
    }

    #[test]
    fn test_from_toml() {
        let options = WriterOptions::from_toml_str("[processing]\nomit_confprop_inject_points = true\n").unwrap();
        assert!(options.omit_confprop_inject_points);
        assert_eq!(options.get(OMIT_CONFPROP_INJECTION_POINTS), Some("true"));

        let empty = WriterOptions::from_toml_str("").unwrap();
        assert!(!empty.omit_confprop_inject_points);
        assert!(WriterOptions::from_toml_str("[processing]\nomit_confprop_inject_points = 3\n").is_err());
    }
}
