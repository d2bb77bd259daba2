//! Appender trait for log output destinations

use super::{error::Result, log_level::LogLevel};

/// Handler/writer contract: one formatted line in, device write out.
///
/// `line` carries no terminator; the appender adds its own. Errors returned
/// here are absorbed by the logger and reported through its diagnostics.
pub trait Appender: Send {
    fn append(&mut self, line: &str, level: LogLevel) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
