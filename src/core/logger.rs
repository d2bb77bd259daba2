//! Main logger implementation
//!
//! [`Logger`] runs the whole pipeline on the calling thread: entry
//! construction, field composition, serialization, routing and the device
//! write. Serialization failures surface to the caller; device failures are
//! absorbed, counted and reported on stderr.

use super::{
    appender::Appender,
    composer::DefaultField,
    config::LoggerConfig,
    error::{ErrorCallback, LoggerError, Result},
    exception::ExceptionInfo,
    formatter::{Formatter, JsonFormatter, Serializer, SerializerOptions},
    log_context::{FieldValue, Fields, LoggerContext},
    log_entry::{CallSite, LogEntry, LogOptions},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    router::{Channel, StreamRouter},
};
use crate::appenders::StreamAppender;
use parking_lot::{Mutex, RwLock};
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Entry construction and formatting shared by the blocking and
/// non-blocking loggers
pub(crate) struct Pipeline {
    min_level: RwLock<LogLevel>,
    formatter: Arc<dyn Formatter>,
    flatten: bool,
    serializer_options: SerializerOptions,
    context: LoggerContext,
    metrics: Arc<LoggerMetrics>,
    on_error: Option<ErrorCallback>,
}

impl Pipeline {
    pub(crate) fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    pub(crate) fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub(crate) fn context(&self) -> &LoggerContext {
        &self.context
    }

    pub(crate) fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Build and format one entry; `None` when `level` is filtered out
    pub(crate) fn render(
        &self,
        level: LogLevel,
        message: FieldValue,
        options: LogOptions,
        caller: CallSite,
    ) -> Result<Option<String>> {
        if level < self.min_level() {
            return Ok(None);
        }

        let (extra, flatten, serializer_options, exception, call_site) = options.into_parts();
        let serializer_options = match serializer_options {
            Some(call) => call.merged_over(&self.serializer_options),
            None => self.serializer_options.clone(),
        };

        let mut entry = LogEntry::new(level, message)
            .with_call_site(call_site.unwrap_or(caller))
            .with_extra(self.context.overlay(&extra))
            .with_flatten(flatten.unwrap_or(self.flatten))
            .with_serializer_options(serializer_options);
        if let Some(exception) = exception {
            entry = entry.with_exception(exception);
        }

        match self.formatter.format(&entry) {
            Ok(line) => Ok(Some(line)),
            Err(e) => {
                self.metrics.record_serialization_failure();
                Err(e)
            }
        }
    }

    pub(crate) fn report_write_failure(&self, channel: &str, err: &LoggerError) {
        self.metrics.record_write_failure();
        eprintln!("[LOGGER ERROR] Channel '{}' write failed: {}", channel, err);
        if let Some(ref callback) = self.on_error {
            callback(err);
        }
    }

    /// Account for one routed event
    pub(crate) fn record_outcome(&self, routed: bool, failed: bool) {
        if !routed {
            self.metrics.record_unrouted();
        } else if failed {
            self.metrics.record_dropped();
        } else {
            self.metrics.record_logged();
        }
    }
}

/// Exception info for `err` raised at `call_site`, when the caller supplied none
pub(crate) fn attach_exception<E>(options: LogOptions, err: &E, fallback: &CallSite) -> LogOptions
where
    E: Error + ?Sized,
{
    if options.exception_info().is_some() {
        return options;
    }
    let site = options.call_site().unwrap_or(fallback).clone();
    options.exception(ExceptionInfo::from_error(err, &site))
}

/// Warn once, at setup, about severities no channel accepts
pub(crate) fn warn_uncovered<T>(router: &StreamRouter<T>, min_level: LogLevel) {
    let uncovered: Vec<String> = router
        .uncovered_levels()
        .into_iter()
        .filter(|level| *level >= min_level)
        .map(|level| level.to_string())
        .collect();

    if !uncovered.is_empty() {
        eprintln!(
            "[LOGGER WARNING] No channel accepts {} events; they will be dropped.",
            uncovered.join(", ")
        );
    }
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Formatting options common to both logger builders
pub(crate) struct PipelineConfig {
    min_level: LogLevel,
    formatter: JsonFormatter,
    custom_formatter: Option<Arc<dyn Formatter>>,
    flatten: bool,
    serializer_options: SerializerOptions,
    excluded: Vec<DefaultField>,
    extra: Fields,
    context: Option<LoggerContext>,
    on_error: Option<ErrorCallback>,
}

impl PipelineConfig {
    pub(crate) fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
            formatter: JsonFormatter::new(),
            custom_formatter: None,
            flatten: false,
            serializer_options: SerializerOptions::default(),
            excluded: Vec::new(),
            extra: Fields::new(),
            context: None,
            on_error: None,
        }
    }

    pub(crate) fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub(crate) fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub(crate) fn set_formatter(&mut self, formatter: Arc<dyn Formatter>) {
        self.custom_formatter = Some(formatter);
    }

    pub(crate) fn set_serializer<S: Serializer + 'static>(&mut self, serializer: S) {
        self.formatter = std::mem::take(&mut self.formatter).with_serializer(serializer);
    }

    /// Exclusions accumulate across builder calls and config files
    pub(crate) fn add_excluded_fields<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = DefaultField>,
    {
        for field in fields {
            if !self.excluded.contains(&field) {
                self.excluded.push(field);
            }
        }
        self.formatter =
            std::mem::take(&mut self.formatter).excluding(self.excluded.iter().copied());
    }

    pub(crate) fn set_serializer_options(&mut self, options: SerializerOptions) {
        self.serializer_options = options;
    }

    pub(crate) fn set_flatten(&mut self, flatten: bool) {
        self.flatten = flatten;
    }

    pub(crate) fn add_extra(&mut self, key: String, value: FieldValue) {
        self.extra.insert(key, value);
    }

    pub(crate) fn set_context(&mut self, context: LoggerContext) {
        self.context = Some(context);
    }

    pub(crate) fn set_on_error(&mut self, callback: ErrorCallback) {
        self.on_error = Some(callback);
    }

    pub(crate) fn apply(&mut self, config: LoggerConfig) {
        let extra = config.extra_fields();
        self.min_level = config.level;
        self.flatten = config.flatten;
        self.serializer_options = config.serializer_options;
        self.add_excluded_fields(config.exclude_fields);
        self.extra.merge(&extra);
    }

    pub(crate) fn build(self) -> Pipeline {
        let context = self.context.unwrap_or_default();
        for (key, value) in self.extra {
            context.set(key, value);
        }

        Pipeline {
            min_level: RwLock::new(self.min_level),
            formatter: self
                .custom_formatter
                .unwrap_or_else(|| Arc::new(self.formatter) as Arc<dyn Formatter>),
            flatten: self.flatten,
            serializer_options: self.serializer_options,
            context,
            metrics: Arc::new(LoggerMetrics::new()),
            on_error: self.on_error,
        }
    }
}

type SyncTarget = Mutex<Box<dyn Appender>>;

/// Synchronous JSON logger
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let buffer = SharedBuffer::new();
/// let logger = Logger::builder()
///     .stream(StreamAppender::new("memory", buffer.clone()))
///     .exclude_fields([DefaultField::FilePath])
///     .build();
///
/// logger.info("service started").unwrap();
/// assert!(buffer.contents().contains("\"msg\":\"service started\""));
/// ```
pub struct Logger {
    pipeline: Pipeline,
    router: StreamRouter<SyncTarget>,
}

impl Logger {
    /// Logger writing DEBUG/INFO to stdout and WARNING and above to stderr
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Default streams configured from `config`
    #[must_use]
    pub fn from_config(config: LoggerConfig) -> Self {
        LoggerBuilder::new().config(config).build()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.pipeline.set_min_level(level);
    }

    pub fn min_level(&self) -> LogLevel {
        self.pipeline.min_level()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }

    /// Logger-level default extra fields
    pub fn context(&self) -> &LoggerContext {
        self.pipeline.context()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        self.pipeline.metrics()
    }

    pub fn dropped_count(&self) -> u64 {
        self.metrics().dropped_count()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.router.channels().iter().map(Channel::name)
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<FieldValue>) -> Result<()> {
        self.log_with(level, message, LogOptions::new())
    }

    /// Log with per-call options
    ///
    /// Returns an error only when the payload cannot be serialized.
    #[track_caller]
    pub fn log_with(
        &self,
        level: LogLevel,
        message: impl Into<FieldValue>,
        options: LogOptions,
    ) -> Result<()> {
        let caller = CallSite::caller();
        if let Some(line) = self.pipeline.render(level, message.into(), options, caller)? {
            self.emit(&line, level);
        }
        Ok(())
    }

    /// Route an already formatted line. Never fails.
    pub fn emit(&self, line: &str, level: LogLevel) {
        let mut routed = false;
        let mut failed = false;

        for channel in self.router.route(level) {
            routed = true;
            let result = catch_unwind(AssertUnwindSafe(|| {
                channel.target().lock().append(line, level)
            }));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed = true;
                    self.pipeline.report_write_failure(channel.name(), &e);
                }
                Err(panic_info) => {
                    failed = true;
                    self.pipeline.metrics().record_write_failure();
                    eprintln!(
                        "[LOGGER CRITICAL] Channel '{}' panicked: {}. \
                         Other channels continue to function.",
                        channel.name(),
                        panic_message(panic_info.as_ref())
                    );
                }
            }
        }

        self.pipeline.record_outcome(routed, failed);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<FieldValue>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<FieldValue>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<FieldValue>) -> Result<()> {
        self.log(LogLevel::Warning, message)
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<FieldValue>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<FieldValue>) -> Result<()> {
        self.log(LogLevel::Critical, message)
    }

    /// ERROR-level entry carrying `err` as exception info
    #[track_caller]
    pub fn exception<E>(&self, message: impl Into<FieldValue>, err: &E) -> Result<()>
    where
        E: Error + ?Sized,
    {
        self.exception_with(message, err, LogOptions::new())
    }

    #[track_caller]
    pub fn exception_with<E>(
        &self,
        message: impl Into<FieldValue>,
        err: &E,
        options: LogOptions,
    ) -> Result<()>
    where
        E: Error + ?Sized,
    {
        let caller = CallSite::caller();
        let options = attach_exception(options, err, &caller);
        if let Some(line) = self
            .pipeline
            .render(LogLevel::Error, message.into(), options, caller)?
        {
            self.emit(&line, LogLevel::Error);
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        for channel in self.router.channels() {
            channel.target().lock().flush()?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }

        let dropped = self.metrics().dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                self.metrics().drop_rate()
            );
        }
    }
}

/// Builder for constructing Logger with a fluent API
///
/// Output channels:
/// - `stream(..)` replaces the stdout/stderr pair with one channel taking
///   every severity;
/// - otherwise the pair is created, using `stdout(..)`/`stderr(..)` devices
///   when given, unless only custom `channel(..)`s were configured;
/// - custom channels are always added after the above.
///
/// # Example
/// ```
/// use rust_json_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Info)
///     .flatten(true)
///     .extra("service", "billing")
///     .serializer_options(SerializerOptions::new().with_sort_keys(true))
///     .on_error(Arc::new(|err| eprintln!("log write failed: {}", err)))
///     .build();
/// assert_eq!(logger.min_level(), LogLevel::Info);
/// ```
pub struct LoggerBuilder {
    pipeline: PipelineConfig,
    stdout: Option<Box<dyn Appender>>,
    stderr: Option<Box<dyn Appender>>,
    stream: Option<Box<dyn Appender>>,
    channels: Vec<Channel<Box<dyn Appender>>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: PipelineConfig::new(),
            stdout: None,
            stderr: None,
            stream: None,
            channels: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.pipeline.set_min_level(level);
        self
    }

    /// Replace the JSON formatter entirely
    #[must_use = "builder methods return a new value"]
    pub fn formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.pipeline.set_formatter(Arc::new(formatter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn serializer<S: Serializer + 'static>(mut self, serializer: S) -> Self {
        self.pipeline.set_serializer(serializer);
        self
    }

    /// Omit default fields; exclusions from repeated calls and configs accumulate
    #[must_use = "builder methods return a new value"]
    pub fn exclude_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = DefaultField>,
    {
        self.pipeline.add_excluded_fields(fields);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn serializer_options(mut self, options: SerializerOptions) -> Self {
        self.pipeline.set_serializer_options(options);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.pipeline.set_flatten(flatten);
        self
    }

    /// Default root-level field for every call
    #[must_use = "builder methods return a new value"]
    pub fn extra<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.pipeline.add_extra(key.into(), value.into());
        self
    }

    /// Share an existing logger-level context
    #[must_use = "builder methods return a new value"]
    pub fn context(mut self, context: LoggerContext) -> Self {
        self.pipeline.set_context(context);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.pipeline.apply(config);
        self
    }

    /// Observe device write failures
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.pipeline.set_on_error(callback);
        self
    }

    /// Device for the DEBUG/INFO channel
    #[must_use = "builder methods return a new value"]
    pub fn stdout<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.stdout = Some(Box::new(appender));
        self
    }

    /// Device for the WARNING-and-above channel
    #[must_use = "builder methods return a new value"]
    pub fn stderr<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.stderr = Some(Box::new(appender));
        self
    }

    /// Single device for every severity
    #[must_use = "builder methods return a new value"]
    pub fn stream<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.stream = Some(Box::new(appender));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn channel<A: Appender + 'static>(mut self, channel: Channel<A>) -> Self {
        self.channels
            .push(channel.map(|appender| Box::new(appender) as Box<dyn Appender>));
        self
    }

    pub fn build(self) -> Logger {
        let mut router = match self.stream {
            Some(stream) => StreamRouter::single(stream),
            None if self.stdout.is_none() && self.stderr.is_none() && !self.channels.is_empty() => {
                StreamRouter::new()
            }
            None => StreamRouter::standard(
                self.stdout
                    .unwrap_or_else(|| Box::new(StreamAppender::stdout()) as Box<dyn Appender>),
                self.stderr
                    .unwrap_or_else(|| Box::new(StreamAppender::stderr()) as Box<dyn Appender>),
            ),
        };
        for channel in self.channels {
            router.add_channel(channel);
        }

        let router = router.map(Mutex::new);
        warn_uncovered(&router, self.pipeline.min_level());

        Logger {
            pipeline: self.pipeline.build(),
            router,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
