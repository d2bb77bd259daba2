//! # Rust JSON Logger
//!
//! A structured logger that renders every log call as one JSON document per
//! line and routes it by severity: DEBUG and INFO go to stdout, WARNING and
//! above go to stderr.
//!
//! ## Features
//!
//! - **Fixed wire vocabulary**: `logged_at`, `line_number`, `function`, `level`,
//!   `file_path`, `msg`, `exc_info`, `exc_text`
//! - **Pluggable serialization**: swap the serializer or the value encoder
//! - **Severity routing**: any number of channels, each with its own filter
//! - **Non-blocking mode**: queue plus drain task per stream on tokio
//!
//! ## Quick start
//!
//! ```
//! use rust_json_logger::prelude::*;
//!
//! let buffer = SharedBuffer::new();
//! let logger = Logger::builder()
//!     .stream(StreamAppender::new("memory", buffer.clone()))
//!     .exclude_fields([DefaultField::FilePath])
//!     .build();
//!
//! logger
//!     .log_with(
//!         LogLevel::Info,
//!         Fields::new().with("artist", "Nina").with("song", "Sinnerman"),
//!         LogOptions::new().flatten(true),
//!     )
//!     .unwrap();
//!
//! let line = buffer.lines().pop().unwrap();
//! assert!(line.contains("\"artist\":\"Nina\""));
//! assert!(!line.contains("file_path"));
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{SharedBuffer, StreamAppender};
    pub use crate::core::{
        Appender, CallSite, Channel, ContextGuard, DefaultField, ExceptionInfo, FieldValue,
        Fields, Formatter, JsonFormatter, LogContext, LogEntry, LogLevel, LogOptions, Logger,
        LoggerBuilder, LoggerConfig, LoggerContext, LoggerError, LoggerMetrics, Result,
        SerializerOptions, StreamRouter,
    };

    #[cfg(feature = "async-appenders")]
    pub use crate::appenders::NonBlockingWriter;
    #[cfg(feature = "async-appenders")]
    pub use crate::core::{AsyncAppender, AsyncLogger, AsyncLoggerBuilder};
}

pub use appenders::{SharedBuffer, StreamAppender};
pub use core::{
    Appender, CallSite, Channel, DefaultField, FieldValue, Fields, Formatter, JsonFormatter,
    LogEntry, LogLevel, LogOptions, Logger, LoggerBuilder, LoggerConfig, LoggerContext,
    LoggerError, LoggerMetrics, Result, SerializerOptions, StreamRouter,
};

#[cfg(feature = "async-appenders")]
pub use appenders::NonBlockingWriter;
#[cfg(feature = "async-appenders")]
pub use core::{AsyncAppender, AsyncLogger, AsyncLoggerBuilder};
