//! Core logger types and traits

pub mod appender;
#[cfg(feature = "async-appenders")]
pub mod async_appender;
#[cfg(feature = "async-appenders")]
pub mod async_logger;
pub mod composer;
pub mod config;
pub mod error;
pub mod exception;
pub mod formatter;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod router;
pub mod timestamp;

pub use appender::Appender;
#[cfg(feature = "async-appenders")]
pub use async_appender::AsyncAppender;
#[cfg(feature = "async-appenders")]
pub use async_logger::{AsyncLogger, AsyncLoggerBuilder};
pub use composer::{DefaultField, FieldComposer};
pub use config::LoggerConfig;
pub use error::{ErrorCallback, LoggerError, Result};
pub use exception::{ExceptionInfo, Traceback};
pub use formatter::{
    DefaultEncoder, Encoder, Formatter, JsonFormatter, JsonSerializer, Serializer,
    SerializerOptions,
};
pub use log_context::{ContextGuard, FieldValue, Fields, LazyValue, LogContext, LoggerContext};
pub use log_entry::{CallSite, LogEntry, LogOptions};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use router::{Channel, LevelFilter, StreamRouter};
