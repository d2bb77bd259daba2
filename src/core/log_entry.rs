//! Log entry structure

use super::exception::ExceptionInfo;
use super::formatter::SerializerOptions;
use super::log_context::{FieldValue, LogContext};
use super::log_level::LogLevel;
use super::timestamp;
use chrono::NaiveDateTime;
use std::panic::Location;

/// Function name recorded when the call site cannot name it
pub const UNKNOWN_FUNCTION: &str = "(unknown function)";

/// Source location of a log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl CallSite {
    /// `function` may be a full path as produced by `std::any::type_name`;
    /// only the innermost named function is kept.
    pub fn new(file: impl Into<String>, line: u32, function: &str) -> Self {
        Self {
            file: file.into(),
            line,
            function: short_function_name(function).to_string(),
        }
    }

    /// File and line of the caller; the function is not recoverable here
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file().to_string(),
            line: location.line(),
            function: UNKNOWN_FUNCTION.to_string(),
        }
    }
}

fn short_function_name(path: &str) -> &str {
    path.rsplit("::")
        .find(|segment| !segment.is_empty() && *segment != "{{closure}}")
        .unwrap_or(UNKNOWN_FUNCTION)
}

/// One log call's captured data.
///
/// Built by the logger with defaults already resolved (effective extra,
/// flatten flag and serializer options), then only read.
#[derive(Debug, Clone)]
pub struct LogEntry {
    level: LogLevel,
    message: FieldValue,
    timestamp: NaiveDateTime,
    call_site: CallSite,
    exception: Option<ExceptionInfo>,
    extra: LogContext,
    flatten: bool,
    serializer_options: SerializerOptions,
}

impl LogEntry {
    #[track_caller]
    pub fn new(level: LogLevel, message: impl Into<FieldValue>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: timestamp::now(),
            call_site: CallSite::caller(),
            exception: None,
            extra: LogContext::new(),
            flatten: false,
            serializer_options: SerializerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = call_site;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: LogContext) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    #[must_use]
    pub fn with_serializer_options(mut self, options: SerializerOptions) -> Self {
        self.serializer_options = options;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &FieldValue {
        &self.message
    }

    pub fn timestamp(&self) -> &NaiveDateTime {
        &self.timestamp
    }

    pub fn call_site(&self) -> &CallSite {
        &self.call_site
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn extra(&self) -> &LogContext {
        &self.extra
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    pub fn serializer_options(&self) -> &SerializerOptions {
        &self.serializer_options
    }
}

/// Per-call options.
///
/// Unset values fall back to the logger's configured defaults; extra fields
/// are merged over the logger-level extra.
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let options = LogOptions::new()
///     .extra("request_id", "abc-123")
///     .flatten(true)
///     .serializer_options(SerializerOptions::new().with_sort_keys(true));
/// assert_eq!(options.flatten_override(), Some(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    extra: LogContext,
    flatten: Option<bool>,
    serializer_options: Option<SerializerOptions>,
    exception: Option<ExceptionInfo>,
    call_site: Option<CallSite>,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one extra root-level field
    #[must_use]
    pub fn extra<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.extra.add_field(key, value);
        self
    }

    /// Add every field of `context` as extra
    #[must_use]
    pub fn with_extra(mut self, context: LogContext) -> Self {
        for (key, value) in context.fields().iter() {
            self.extra.add_field(key.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = Some(flatten);
        self
    }

    #[must_use]
    pub fn serializer_options(mut self, options: SerializerOptions) -> Self {
        self.serializer_options = Some(options);
        self
    }

    #[must_use]
    pub fn exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn at(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    pub fn extra_fields(&self) -> &LogContext {
        &self.extra
    }

    pub fn flatten_override(&self) -> Option<bool> {
        self.flatten
    }

    pub fn serializer_options_override(&self) -> Option<&SerializerOptions> {
        self.serializer_options.as_ref()
    }

    pub fn exception_info(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        LogContext,
        Option<bool>,
        Option<SerializerOptions>,
        Option<ExceptionInfo>,
        Option<CallSite>,
    ) {
        (
            self.extra,
            self.flatten,
            self.serializer_options,
            self.exception,
            self.call_site,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_function_name() {
        assert_eq!(short_function_name("my_app::handlers::login"), "login");
        assert_eq!(
            short_function_name("my_app::handlers::login::{{closure}}::{{closure}}"),
            "login"
        );
        assert_eq!(short_function_name("main"), "main");
        assert_eq!(short_function_name(""), UNKNOWN_FUNCTION);
    }

    #[test]
    fn test_caller_location() {
        let site = CallSite::caller();
        assert!(site.file.ends_with("log_entry.rs"));
        assert!(site.line > 0);
        assert_eq!(site.function, UNKNOWN_FUNCTION);
    }

    #[test]
    fn test_entry_defaults() {
        let entry = LogEntry::new(LogLevel::Info, "hello");
        assert_eq!(entry.level(), LogLevel::Info);
        assert_eq!(entry.message(), &FieldValue::from("hello"));
        assert!(!entry.flatten());
        assert!(entry.exception().is_none());
        assert!(entry.extra().is_empty());
        assert!(entry.call_site().file.ends_with("log_entry.rs"));
    }

    #[test]
    fn test_options_collect_extra() {
        let options = LogOptions::new()
            .extra("a", 1)
            .with_extra(LogContext::new().with_field("b", 2).with_field("a", 3));

        let extra = options.extra_fields().fields();
        assert_eq!(extra.len(), 2);
        assert_eq!(extra.get("a"), Some(&FieldValue::Int(3)));
    }
}
