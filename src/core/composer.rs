//! Field composition: log entry -> ordered output document

use super::log_context::{FieldValue, Fields};
use super::log_entry::LogEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MSG_FIELD: &str = "msg";
pub const EXC_INFO_FIELD: &str = "exc_info";
pub const EXC_TEXT_FIELD: &str = "exc_text";

/// The five metadata fields seeded into every document unless excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultField {
    LoggedAt,
    LineNumber,
    Function,
    Level,
    FilePath,
}

impl DefaultField {
    /// Canonical seeding order
    pub const ALL: [DefaultField; 5] = [
        DefaultField::LoggedAt,
        DefaultField::LineNumber,
        DefaultField::Function,
        DefaultField::Level,
        DefaultField::FilePath,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DefaultField::LoggedAt => "logged_at",
            DefaultField::LineNumber => "line_number",
            DefaultField::Function => "function",
            DefaultField::Level => "level",
            DefaultField::FilePath => "file_path",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    fn value(&self, entry: &LogEntry) -> FieldValue {
        match self {
            DefaultField::LoggedAt => FieldValue::DateTime(*entry.timestamp()),
            DefaultField::LineNumber => FieldValue::from(entry.call_site().line),
            DefaultField::Function => FieldValue::from(entry.call_site().function.as_str()),
            DefaultField::Level => FieldValue::from(entry.level().to_str()),
            DefaultField::FilePath => FieldValue::from(entry.call_site().file.as_str()),
        }
    }
}

impl fmt::Display for DefaultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DefaultField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DefaultField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("Unknown default field: '{}'", s))
    }
}

/// Builds the output document from a log entry.
///
/// Precedence, lowest to highest: default fields, flattened message, extra.
/// The enabled default-field set is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldComposer {
    enabled: [bool; 5],
}

impl FieldComposer {
    /// Composer with every default field enabled
    pub fn new() -> Self {
        Self { enabled: [true; 5] }
    }

    /// Composer with the given default fields disabled
    pub fn excluding<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = DefaultField>,
    {
        let mut composer = Self::new();
        for field in fields {
            composer.enabled[field.index()] = false;
        }
        composer
    }

    pub fn is_enabled(&self, field: DefaultField) -> bool {
        self.enabled[field.index()]
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = DefaultField> + '_ {
        DefaultField::ALL
            .iter()
            .copied()
            .filter(|field| self.is_enabled(*field))
    }

    /// Build the ordered document for one entry
    pub fn compose(&self, entry: &LogEntry) -> Fields {
        let mut document = Fields::new();

        for field in self.enabled_fields() {
            document.insert(field.name(), field.value(entry));
        }

        match entry.message() {
            FieldValue::Map(message) if entry.flatten() => document.merge(message),
            FieldValue::Json(serde_json::Value::Object(message)) if entry.flatten() => {
                for (key, value) in message {
                    document.insert(key.clone(), FieldValue::Json(value.clone()));
                }
            }
            message => {
                document.insert(MSG_FIELD, message.clone());
            }
        }

        document.merge(entry.extra().fields());

        if let Some(exception) = entry.exception() {
            let exc_info = vec![
                FieldValue::from(exception.type_name.as_str()),
                FieldValue::Exception(exception.clone()),
                FieldValue::Traceback(exception.traceback.clone()),
            ];
            document.insert(EXC_INFO_FIELD, exc_info);
            if let Some(ref text) = exception.text {
                document.insert(EXC_TEXT_FIELD, text.as_str());
            }
        }

        document
    }
}

impl Default for FieldComposer {
    fn default() -> Self {
        Self::new()
    }
}
