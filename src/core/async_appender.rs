//! Async appender trait for non-blocking log output

use super::{error::Result, log_level::LogLevel};
use async_trait::async_trait;

/// Trait for non-blocking log appenders
///
/// `append` hands a line off and returns without waiting for the device;
/// `flush` resolves once everything handed off before it has been written.
///
/// # Example
///
/// ```no_run
/// use rust_json_logger::core::{AsyncAppender, LogLevel, Result};
/// use async_trait::async_trait;
///
/// struct Discard;
///
/// #[async_trait]
/// impl AsyncAppender for Discard {
///     fn append(&self, _line: &str, _level: LogLevel) -> Result<()> {
///         Ok(())
///     }
///
///     async fn flush(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "discard"
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncAppender: Send + Sync {
    /// Queue one formatted line; never waits on the device
    fn append(&self, line: &str, level: LogLevel) -> Result<()>;

    /// Wait until every previously queued line has drained
    async fn flush(&self) -> Result<()>;

    /// Drain and release the device
    async fn close(&self) -> Result<()> {
        self.flush().await
    }

    /// Get the appender name
    fn name(&self) -> &str;
}
