//! Declarative logger configuration
//!
//! `LoggerConfig` mirrors the builder's formatting options so a logger can be
//! set up from a JSON document:
//!
//! ```json
//! {
//!   "level": "INFO",
//!   "flatten": true,
//!   "exclude_fields": ["file_path"],
//!   "serializer_options": { "sort_keys": true },
//!   "extra": { "service": "billing" }
//! }
//! ```

use super::composer::DefaultField;
use super::error::{LoggerError, Result};
use super::formatter::SerializerOptions;
use super::log_context::Fields;
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Minimum severity emitted
    pub level: LogLevel,
    /// Default flatten flag for every call
    pub flatten: bool,
    /// Default metadata fields to omit
    pub exclude_fields: Vec<DefaultField>,
    /// Default serializer options for every call
    pub serializer_options: SerializerOptions,
    /// Default root-level fields for every call
    pub extra: Map<String, Value>,
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(config: &str) -> Result<Self> {
        serde_json::from_str(config)
            .map_err(|e| LoggerError::config("LoggerConfig", e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logger configuration",
                path.display().to_string(),
                e,
            )
        })?;
        Self::from_json_str(&contents)
    }

    /// `extra` as logger-level default fields
    pub fn extra_fields(&self) -> Fields {
        self.extra
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::FieldValue;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = LoggerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.flatten);
    }

    #[test]
    fn test_full_document() {
        let config = LoggerConfig::from_json_str(
            r#"{
                "level": "WARNING",
                "flatten": true,
                "exclude_fields": ["file_path", "line_number"],
                "serializer_options": {"indent": 2, "sort_keys": true},
                "extra": {"service": "billing", "replica": 3}
            }"#,
        )
        .unwrap();

        assert_eq!(config.level, LogLevel::Warning);
        assert!(config.flatten);
        assert_eq!(
            config.exclude_fields,
            vec![DefaultField::FilePath, DefaultField::LineNumber]
        );
        assert_eq!(config.serializer_options.indent, Some(2));
        assert_eq!(config.serializer_options.sort_keys, Some(true));

        let extra = config.extra_fields();
        assert_eq!(extra.keys().collect::<Vec<_>>(), vec!["service", "replica"]);
        assert_eq!(
            extra.get("service"),
            Some(&FieldValue::Json(Value::String("billing".into())))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = LoggerConfig::from_json_str(r#"{"exclude_fields": ["path"]}"#).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerConfig::from_json_str(r#"{"colour": true}"#).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"level": "ERROR", "extra": {{"env": "test"}}}}"#).unwrap();

        let config = LoggerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.extra.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoggerConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }
}
