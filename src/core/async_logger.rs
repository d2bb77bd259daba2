//! Non-blocking logger
//!
//! [`AsyncLogger`] composes and formats on the calling task, hands the line to
//! the routed [`AsyncAppender`]s without waiting, and returns a future that
//! resolves once those appenders have drained it. Dropping the future does
//! not cancel the write.

use super::{
    async_appender::AsyncAppender,
    composer::DefaultField,
    config::LoggerConfig,
    error::{ErrorCallback, Result},
    formatter::{Formatter, Serializer, SerializerOptions},
    log_context::{FieldValue, LoggerContext},
    log_entry::{CallSite, LogOptions},
    log_level::LogLevel,
    logger::{attach_exception, panic_message, warn_uncovered, Pipeline, PipelineConfig},
    metrics::LoggerMetrics,
    router::{Channel, StreamRouter},
};
use crate::appenders::NonBlockingWriter;
use std::error::Error;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type AsyncTarget = Arc<dyn AsyncAppender>;

/// JSON logger for async applications
///
/// # Example
///
/// ```no_run
/// use rust_json_logger::prelude::*;
///
/// # async fn example() -> rust_json_logger::Result<()> {
/// let logger = AsyncLogger::init()?;
/// logger.info("listening on :8080").await?;
/// logger
///     .log_with(LogLevel::Warning, "slow request", LogOptions::new().extra("ms", 812))
///     .await?;
/// logger.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct AsyncLogger {
    pipeline: Pipeline,
    router: StreamRouter<AsyncTarget>,
}

impl AsyncLogger {
    #[must_use]
    pub fn builder() -> AsyncLoggerBuilder {
        AsyncLoggerBuilder::new()
    }

    /// Non-blocking writers on stdout and stderr with the default split.
    /// Must be called inside a tokio runtime.
    pub fn init() -> Result<Self> {
        AsyncLoggerBuilder::new().build()
    }

    pub fn from_config(config: LoggerConfig) -> Result<Self> {
        AsyncLoggerBuilder::new().config(config).build()
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

    pub fn context(&self) -> &LoggerContext {
        self.pipeline.context()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        self.pipeline.metrics()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.router.channels().iter().map(Channel::name)
    }

    #[track_caller]
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log_with(level, message, LogOptions::new())
    }

    /// Format and hand off now; the returned future waits for the drain.
    ///
    /// A serialization failure is reported by the future.
    #[track_caller]
    pub fn log_with(
        &self,
        level: LogLevel,
        message: impl Into<FieldValue>,
        options: LogOptions,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let caller = CallSite::caller();
        let dispatched = self
            .pipeline
            .render(level, message.into(), options, caller)
            .map(|line| match line {
                Some(line) => self.emit(&line, level),
                None => Vec::new(),
            });
        drained(dispatched)
    }

    /// Hand an already formatted line to every accepting channel.
    /// Returns the appenders that took it.
    pub fn emit(&self, line: &str, level: LogLevel) -> Vec<Arc<dyn AsyncAppender>> {
        let mut routed = false;
        let mut failed = false;
        let mut accepted = Vec::new();

        for channel in self.router.route(level) {
            routed = true;
            let result = catch_unwind(AssertUnwindSafe(|| channel.target().append(line, level)));

            match result {
                Ok(Ok(())) => accepted.push(Arc::clone(channel.target())),
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
        accepted
    }

    #[track_caller]
    pub fn debug(
        &self,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log(LogLevel::Debug, message)
    }

    #[track_caller]
    pub fn info(
        &self,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log(LogLevel::Info, message)
    }

    #[track_caller]
    pub fn warning(
        &self,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log(LogLevel::Warning, message)
    }

    #[track_caller]
    pub fn error(
        &self,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log(LogLevel::Error, message)
    }

    #[track_caller]
    pub fn critical(
        &self,
        message: impl Into<FieldValue>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        self.log(LogLevel::Critical, message)
    }

    #[track_caller]
    pub fn exception<E>(
        &self,
        message: impl Into<FieldValue>,
        err: &E,
    ) -> impl Future<Output = Result<()>> + Send + 'static
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
    ) -> impl Future<Output = Result<()>> + Send + 'static
    where
        E: Error + ?Sized,
    {
        let caller = CallSite::caller();
        let options = attach_exception(options, err, &caller);
        self.log_with(LogLevel::Error, message, options)
    }

    /// Wait for every channel to drain
    pub async fn flush(&self) -> Result<()> {
        for channel in self.router.channels() {
            channel.target().flush().await?;
        }
        Ok(())
    }

    /// Drain and release every channel
    pub async fn close(&self) -> Result<()> {
        for channel in self.router.channels() {
            channel.target().close().await?;
        }
        Ok(())
    }
}

async fn drained(dispatched: Result<Vec<Arc<dyn AsyncAppender>>>) -> Result<()> {
    for appender in dispatched? {
        // Device failures were already counted by the appender
        let _ = appender.flush().await;
    }
    Ok(())
}

/// Builder for [`AsyncLogger`]
///
/// Channel selection follows [`LoggerBuilder`](super::logger::LoggerBuilder);
/// missing stdout/stderr devices are created as [`NonBlockingWriter`]s on the
/// process streams at `build()`.
pub struct AsyncLoggerBuilder {
    pipeline: PipelineConfig,
    stdout: Option<AsyncTarget>,
    stderr: Option<AsyncTarget>,
    stream: Option<AsyncTarget>,
    channels: Vec<Channel<AsyncTarget>>,
}

impl AsyncLoggerBuilder {
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

    #[must_use = "builder methods return a new value"]
    pub fn extra<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.pipeline.add_extra(key.into(), value.into());
        self
    }

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

    /// Observe hand-off failures (closed writers)
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.pipeline.set_on_error(callback);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn stdout<A: AsyncAppender + 'static>(mut self, appender: A) -> Self {
        self.stdout = Some(Arc::new(appender));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn stderr<A: AsyncAppender + 'static>(mut self, appender: A) -> Self {
        self.stderr = Some(Arc::new(appender));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn stream<A: AsyncAppender + 'static>(mut self, appender: A) -> Self {
        self.stream = Some(Arc::new(appender));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn channel<A: AsyncAppender + 'static>(mut self, channel: Channel<A>) -> Self {
        self.channels
            .push(channel.map(|appender| Arc::new(appender) as AsyncTarget));
        self
    }

    pub fn build(self) -> Result<AsyncLogger> {
        let mut router = match self.stream {
            Some(stream) => StreamRouter::single(stream),
            None if self.stdout.is_none() && self.stderr.is_none() && !self.channels.is_empty() => {
                StreamRouter::new()
            }
            None => {
                let stdout = match self.stdout {
                    Some(stdout) => stdout,
                    None => Arc::new(NonBlockingWriter::stdout()?) as AsyncTarget,
                };
                let stderr = match self.stderr {
                    Some(stderr) => stderr,
                    None => Arc::new(NonBlockingWriter::stderr()?) as AsyncTarget,
                };
                StreamRouter::standard(stdout, stderr)
            }
        };
        for channel in self.channels {
            router.add_channel(channel);
        }
        warn_uncovered(&router, self.pipeline.min_level());

        Ok(AsyncLogger {
            pipeline: self.pipeline.build(),
            router,
        })
    }
}

impl Default for AsyncLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
