//! Structured values and key-value fields
//!
//! This module provides:
//! - `FieldValue`: the value model every log field is expressed in
//! - `Fields`: an insertion-ordered field map
//! - `LogContext`: per-call extra fields
//! - `LoggerContext`: logger-level default extra fields
//! - `ContextGuard`: RAII guard for scoped logger-level fields

use super::exception::{ExceptionInfo, Traceback};
use super::timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Value computed when the document is encoded, not when the entry is built
#[derive(Clone)]
pub struct LazyValue(Arc<dyn Fn() -> FieldValue + Send + Sync>);

impl LazyValue {
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        Self(Arc::new(producer))
    }

    pub fn resolve(&self) -> FieldValue {
        (self.0)()
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyValue(..)")
    }
}

/// Value type for structured logging fields
#[derive(Clone)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Array(Vec<FieldValue>),
    Map(Fields),
    /// Already JSON-native, passed through untouched
    Json(serde_json::Value),
    Exception(ExceptionInfo),
    Traceback(Traceback),
    Lazy(LazyValue),
    /// Opaque value, encoded through its `Display` rendering
    Display(Arc<dyn fmt::Display + Send + Sync>),
}

impl FieldValue {
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        FieldValue::Lazy(LazyValue::new(producer))
    }

    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        FieldValue::Display(Arc::new(value))
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// True for values that flatten into the document root
    pub fn is_map(&self) -> bool {
        matches!(
            self,
            FieldValue::Map(_) | FieldValue::Json(serde_json::Value::Object(_))
        )
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            FieldValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            FieldValue::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            FieldValue::Float(fl) => f.debug_tuple("Float").field(fl).finish(),
            FieldValue::String(s) => f.debug_tuple("String").field(s).finish(),
            FieldValue::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
            FieldValue::Date(d) => f.debug_tuple("Date").field(d).finish(),
            FieldValue::Time(t) => f.debug_tuple("Time").field(t).finish(),
            FieldValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            FieldValue::Map(fields) => f.debug_tuple("Map").field(fields).finish(),
            FieldValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            FieldValue::Exception(e) => f.debug_tuple("Exception").field(e).finish(),
            FieldValue::Traceback(tb) => f.debug_tuple("Traceback").field(tb).finish(),
            FieldValue::Lazy(lazy) => fmt::Debug::fmt(lazy, f),
            // Opaque values only expose their rendering
            FieldValue::Display(d) => f.debug_tuple("Display").field(&d.to_string()).finish(),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (String(a), String(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Json(a), Json(b)) => a == b,
            (Exception(a), Exception(b)) => a == b,
            (Traceback(a), Traceback(b)) => a == b,
            (Lazy(a), Lazy(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Display(a), Display(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::DateTime(dt) => write!(f, "{}", timestamp::format_timestamp(dt)),
            FieldValue::Date(d) => write!(f, "{}", timestamp::format_date(d)),
            FieldValue::Time(t) => write!(f, "{}", timestamp::format_time(t)),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(fields) => write!(f, "{}", fields),
            FieldValue::Json(v) => write!(f, "{}", v),
            FieldValue::Exception(e) => write!(f, "{}", e),
            FieldValue::Traceback(tb) => write!(f, "{}", tb),
            FieldValue::Lazy(lazy) => write!(f, "{}", lazy.resolve()),
            FieldValue::Display(d) => write!(f, "{}", d),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(u: u64) -> Self {
        FieldValue::UInt(u)
    }
}

impl From<u32> for FieldValue {
    fn from(u: u32) -> Self {
        FieldValue::UInt(u as u64)
    }
}

impl From<usize> for FieldValue {
    fn from(u: usize) -> Self {
        FieldValue::UInt(u as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<f32> for FieldValue {
    fn from(f: f32) -> Self {
        FieldValue::Float(f as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue {
    fn from(dt: DateTime<Tz>) -> Self {
        FieldValue::DateTime(timestamp::to_local_naive(&dt))
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(t: NaiveTime) -> Self {
        FieldValue::Time(t)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Json(v)
    }
}

impl From<Fields> for FieldValue {
    fn from(fields: Fields) -> Self {
        FieldValue::Map(fields)
    }
}

impl From<ExceptionInfo> for FieldValue {
    fn from(e: ExceptionInfo) -> Self {
        FieldValue::Exception(e)
    }
}

impl From<Traceback> for FieldValue {
    fn from(tb: Traceback) -> Self {
        FieldValue::Traceback(tb)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> From<BTreeMap<K, V>> for FieldValue {
    fn from(map: BTreeMap<K, V>) -> Self {
        FieldValue::Map(map.into_iter().collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Insertion-ordered map of fields.
///
/// Inserting an existing key replaces its value in place, so the key keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<FieldValue>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.0 == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    #[must_use]
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Shallow merge: every key of `other` overwrites the same key here
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in other.iter() {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join(" "))
    }
}

/// Per-call extra fields merged into the document root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContext {
    fields: Fields,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self {
            fields: Fields::new(),
        }
    }

    /// Add a field to the context
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key, value);
        self
    }

    /// Add a field to the context (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key, value);
    }

    /// Get all fields
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Check if context has any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Fields> for LogContext {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields)
    }
}

/// Logger-level default extra fields
///
/// `LoggerContext` stores fields that are merged into every document the
/// logger produces. Per-call extra fields win on key collision.
///
/// Thread-safe: Can be safely shared across threads.
///
/// # Example
///
/// ```
/// use rust_json_logger::core::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "api-gateway");
/// ctx.set("version", "1.2.3");
///
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LoggerContext {
    fields: Arc<RwLock<Fields>>,
}

impl LoggerContext {
    /// Create a new empty logger context
    pub fn new() -> Self {
        Self {
            fields: Arc::new(RwLock::new(Fields::new())),
        }
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self {
            fields: Arc::new(RwLock::new(fields)),
        }
    }

    /// Set a field in the context
    ///
    /// If the field already exists, it will be overwritten.
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.write().insert(key, value);
    }

    /// Remove a field from the context
    pub fn remove(&self, key: &str) {
        self.fields.write().remove(key);
    }

    /// Clear all fields from the context
    pub fn clear(&self) {
        self.fields.write().clear();
    }

    /// Get a clone of all fields
    pub fn get_fields(&self) -> Fields {
        self.fields.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Effective extra for one call: these defaults, overwritten by `call`
    pub fn overlay(&self, call: &LogContext) -> LogContext {
        let mut merged = self.fields.read().clone();
        merged.merge(call.fields());
        LogContext::from(merged)
    }

    /// Set `key` until the returned guard is dropped
    pub fn scoped<K, V>(&self, key: K, value: V) -> ContextGuard
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let previous = self.fields.write().insert(key.clone(), value);
        ContextGuard::new(Arc::clone(&self.fields), key, previous)
    }
}

impl Default for LoggerContext {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for scoped context fields
///
/// When dropped, restores the value the key held before the scope began, or
/// removes the key if it had none.
///
/// # Example
///
/// ```
/// use rust_json_logger::core::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// {
///     let _guard = ctx.scoped("request_id", "abc-123");
///     assert_eq!(ctx.len(), 1);
/// }
/// assert!(ctx.is_empty());
/// ```
pub struct ContextGuard {
    context: Arc<RwLock<Fields>>,
    key: String,
    previous: Option<FieldValue>,
}

impl ContextGuard {
    fn new(context: Arc<RwLock<Fields>>, key: String, previous: Option<FieldValue>) -> Self {
        Self {
            context,
            key,
            previous,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let mut fields = self.context.write();
        match self.previous.take() {
            Some(value) => {
                fields.insert(self.key.clone(), value);
            }
            None => {
                fields.remove(&self.key);
            }
        }
    }
}
