//! JSON formatting of log entries
//!
//! A [`JsonFormatter`] composes the output document with a [`FieldComposer`]
//! and hands it to a pluggable [`Serializer`] together with an [`Encoder`]
//! for values JSON cannot represent natively.

use super::composer::{DefaultField, FieldComposer};
use super::error::{LoggerError, Result};
use super::log_context::{FieldValue, Fields};
use super::log_entry::LogEntry;
use super::timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Nesting depth at which encoding gives up (lazy chains included)
pub const MAX_ENCODE_DEPTH: usize = 128;

/// Options forwarded to the serializer.
///
/// Unset options fall back to the value configured one level up; `custom`
/// carries serializer-specific keys for user-supplied serializers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_keys: Option<bool>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

impl SerializerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    #[must_use]
    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = Some(sort_keys);
        self
    }

    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// These options layered over `base`: set values here win
    #[must_use]
    pub fn merged_over(&self, base: &SerializerOptions) -> SerializerOptions {
        let mut custom = base.custom.clone();
        for (key, value) in &self.custom {
            custom.insert(key.clone(), value.clone());
        }
        SerializerOptions {
            indent: self.indent.or(base.indent),
            sort_keys: self.sort_keys.or(base.sort_keys),
            custom,
        }
    }
}

/// Fallback encoding for values the serializer has no native form for
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &FieldValue) -> Result<Value>;

    fn encode_document(&self, document: &Fields) -> Result<Value> {
        let mut object = Map::new();
        for (key, value) in document.iter() {
            object.insert(key.clone(), self.encode(value)?);
        }
        Ok(Value::Object(object))
    }
}

/// Encoding policy, tried in order:
///
/// 1. date/time values -> fixed-format timestamp string
/// 2. tracebacks -> one string per formatted source line
/// 3. exceptions -> `"Exception: <message>"`
/// 4. lazy values -> produced value, encoded again
/// 5. anything else -> its `Display` rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoder;

impl DefaultEncoder {
    pub fn new() -> Self {
        Self
    }

    fn encode_at(&self, value: &FieldValue, depth: usize) -> Result<Value> {
        if depth > MAX_ENCODE_DEPTH {
            return Err(LoggerError::serialization(format!(
                "value nesting exceeds {} levels",
                MAX_ENCODE_DEPTH
            )));
        }

        let encoded = match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::UInt(u) => Value::from(*u),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Json(v) => v.clone(),
            FieldValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.encode_at(item, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
            FieldValue::Map(fields) => {
                let mut object = Map::new();
                for (key, item) in fields.iter() {
                    object.insert(key.clone(), self.encode_at(item, depth + 1)?);
                }
                Value::Object(object)
            }
            FieldValue::DateTime(dt) => Value::String(timestamp::format_timestamp(dt)),
            FieldValue::Date(d) => Value::String(timestamp::format_date(d)),
            FieldValue::Time(t) => Value::String(timestamp::format_time(t)),
            FieldValue::Traceback(tb) => {
                Value::Array(tb.lines().into_iter().map(Value::String).collect())
            }
            FieldValue::Exception(e) => Value::String(format!("Exception: {}", e.message)),
            FieldValue::Lazy(lazy) => self.encode_at(&lazy.resolve(), depth + 1)?,
            FieldValue::Display(d) => Value::String(d.to_string()),
        };

        Ok(encoded)
    }
}

impl Encoder for DefaultEncoder {
    fn encode(&self, value: &FieldValue) -> Result<Value> {
        self.encode_at(value, 0)
    }
}

/// Turns an output document into text
///
/// Any closure `Fn(&Fields, &dyn Encoder, &SerializerOptions) -> Result<String>`
/// is a serializer.
pub trait Serializer: Send + Sync {
    fn serialize(
        &self,
        document: &Fields,
        encoder: &dyn Encoder,
        options: &SerializerOptions,
    ) -> Result<String>;
}

impl<F> Serializer for F
where
    F: Fn(&Fields, &dyn Encoder, &SerializerOptions) -> Result<String> + Send + Sync,
{
    fn serialize(
        &self,
        document: &Fields,
        encoder: &dyn Encoder,
        options: &SerializerOptions,
    ) -> Result<String> {
        self(document, encoder, options)
    }
}

/// serde_json-backed serializer honouring `indent` and `sort_keys`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize(
        &self,
        document: &Fields,
        encoder: &dyn Encoder,
        options: &SerializerOptions,
    ) -> Result<String> {
        let mut value = encoder.encode_document(document)?;
        if options.sort_keys.unwrap_or(false) {
            value = sort_keys(value);
        }

        match options.indent {
            None => Ok(serde_json::to_string(&value)?),
            Some(width) => {
                let indent = " ".repeat(width);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                value.serialize(&mut ser)?;
                String::from_utf8(buf).map_err(|e| LoggerError::serialization(e.to_string()))
            }
        }
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Formatter contract: log entry in, text out
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry) -> Result<String>;
}

/// Composes and serializes log entries to JSON
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let formatter = JsonFormatter::new().excluding([DefaultField::FilePath]);
/// let entry = LogEntry::new(LogLevel::Info, "Request processed");
///
/// let line = formatter.format(&entry).unwrap();
/// assert!(line.contains("\"msg\":\"Request processed\""));
/// assert!(!line.contains("file_path"));
/// ```
#[derive(Clone)]
pub struct JsonFormatter {
    composer: FieldComposer,
    serializer: Arc<dyn Serializer>,
    encoder: Arc<dyn Encoder>,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            composer: FieldComposer::new(),
            serializer: Arc::new(JsonSerializer),
            encoder: Arc::new(DefaultEncoder),
        }
    }

    #[must_use]
    pub fn with_serializer<S: Serializer + 'static>(mut self, serializer: S) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    #[must_use]
    pub fn with_encoder<E: Encoder + 'static>(mut self, encoder: E) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    #[must_use]
    pub fn with_composer(mut self, composer: FieldComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Omit the given default metadata fields from every document
    #[must_use]
    pub fn excluding<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = DefaultField>,
    {
        self.composer = FieldComposer::excluding(fields);
        self
    }

    pub fn composer(&self) -> &FieldComposer {
        &self.composer
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, entry: &LogEntry) -> Result<String> {
        let document = self.composer.compose(entry);
        self.serializer
            .serialize(&document, self.encoder.as_ref(), entry.serializer_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exception::{ExceptionInfo, Traceback};
    use crate::core::log_entry::CallSite;
    use crate::core::log_level::LogLevel;
    use chrono::NaiveDate;

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).expect("valid JSON")
    }

    #[test]
    fn test_datetime_encoded_with_fixed_format() {
        let dt = NaiveDate::from_ymd_opt(2017, 3, 31)
            .and_then(|d| d.and_hms_opt(4, 20, 0))
            .unwrap();
        let value = DefaultEncoder.encode(&FieldValue::from(dt)).unwrap();
        assert_eq!(value, Value::String("2017-03-31T04:20:00.000000".into()));
    }

    #[test]
    fn test_exception_and_traceback_encoding() {
        let mut tb = Traceback::new();
        tb.push_call_site(&CallSite::new("src/a.rs", 3, "run"));
        let info = ExceptionInfo::new("Error", "disk full", tb.clone());

        let encoded = DefaultEncoder.encode(&FieldValue::from(info)).unwrap();
        assert_eq!(encoded, Value::String("Exception: disk full".into()));

        let encoded = DefaultEncoder.encode(&FieldValue::from(tb)).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!(["  File \"src/a.rs\", line 3, in run"])
        );
    }

    #[test]
    fn test_lazy_value_resolved_and_reencoded() {
        let lazy = FieldValue::lazy(|| {
            FieldValue::from(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap())
        });
        assert_eq!(DefaultEncoder.encode(&lazy).unwrap(), Value::String("2020-01-02".into()));
    }

    #[test]
    fn test_opaque_value_uses_display() {
        struct Opaque;
        impl std::fmt::Display for Opaque {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "<Opaque object>")
            }
        }
        let value = DefaultEncoder.encode(&FieldValue::display(Opaque)).unwrap();
        assert_eq!(value, Value::String("<Opaque object>".into()));
    }

    #[test]
    fn test_non_finite_float_stringified() {
        let value = DefaultEncoder.encode(&FieldValue::Float(f64::NAN)).unwrap();
        assert_eq!(value, Value::String("NaN".into()));
    }

    #[test]
    fn test_runaway_lazy_chain_fails() {
        fn forever() -> FieldValue {
            FieldValue::lazy(forever)
        }
        let err = DefaultEncoder.encode(&forever()).unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_sort_keys_and_indent() {
        let doc = Fields::new().with("b", 1).with("a", Fields::new().with("d", 1).with("c", 2));
        let options = SerializerOptions::new().with_sort_keys(true).with_indent(2);
        let out = JsonSerializer.serialize(&doc, &DefaultEncoder, &options).unwrap();

        assert_eq!(out, "{\n  \"a\": {\n    \"c\": 2,\n    \"d\": 1\n  },\n  \"b\": 1\n}");
    }

    #[test]
    fn test_insertion_order_without_sort() {
        let doc = Fields::new().with("b", 1).with("a", 2);
        let out = JsonSerializer
            .serialize(&doc, &DefaultEncoder, &SerializerOptions::default())
            .unwrap();
        assert_eq!(out, r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn test_options_merge() {
        let base = SerializerOptions::new().with_indent(4).with_custom("a", 1);
        let call = SerializerOptions::new().with_sort_keys(true).with_custom("a", 2);
        let merged = call.merged_over(&base);

        assert_eq!(merged.indent, Some(4));
        assert_eq!(merged.sort_keys, Some(true));
        assert_eq!(merged.custom.get("a"), Some(&Value::from(2)));
    }

    #[test]
    fn test_custom_serializer_receives_options() {
        let serializer = |doc: &Fields, _enc: &dyn Encoder, opts: &SerializerOptions| -> Result<String> {
            Ok(format!(
                "{} fields, marker={}",
                doc.len(),
                opts.custom.get("marker").cloned().unwrap_or(Value::Null)
            ))
        };
        let formatter = JsonFormatter::new()
            .with_serializer(serializer)
            .excluding(DefaultField::ALL);
        let entry = LogEntry::new(LogLevel::Info, "x")
            .with_serializer_options(SerializerOptions::new().with_custom("marker", "m"));

        assert_eq!(formatter.format(&entry).unwrap(), "1 fields, marker=\"m\"");
    }

    #[test]
    fn test_serializer_failure_propagates() {
        let failing = |_: &Fields, _: &dyn Encoder, _: &SerializerOptions| -> Result<String> {
            Err(LoggerError::serialization("cyclic structure"))
        };
        let formatter = JsonFormatter::new().with_serializer(failing);
        let err = formatter
            .format(&LogEntry::new(LogLevel::Error, "x"))
            .unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_format_produces_valid_json_with_escapes() {
        let message = "\"quoted\" `tick` /\t \\ ' \n end";
        let line = JsonFormatter::new()
            .format(&LogEntry::new(LogLevel::Error, message))
            .unwrap();
        assert_eq!(parse(&line)["msg"], Value::String(message.into()));
        assert!(!line.contains('\n'));
    }
}
