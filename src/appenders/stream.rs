//! Blocking stream appender
//!
//! Writes each formatted line followed by a terminator to any `io::Write`
//! device and flushes it, so a line is on the device when `append` returns.

use crate::core::{Appender, LogLevel, LoggerError, Result};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

pub const DEFAULT_TERMINATOR: &str = "\n";

pub struct StreamAppender<W: Write + Send> {
    name: String,
    writer: W,
    terminator: String,
}

impl StreamAppender<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }
}

impl StreamAppender<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new("stderr", io::stderr())
    }
}

impl<W: Write + Send> StreamAppender<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            terminator: DEFAULT_TERMINATOR.to_string(),
        }
    }

    #[must_use]
    pub fn with_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Appender for StreamAppender<W> {
    fn append(&mut self, line: &str, _level: LogLevel) -> Result<()> {
        let mut record = String::with_capacity(line.len() + self.terminator.len());
        record.push_str(line);
        record.push_str(&self.terminator);

        self.writer
            .write_all(record.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|e| LoggerError::io_operation("writing log line", self.name.clone(), e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing stream", self.name.clone(), e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory device that can be handed to an appender and read back
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    /// Non-empty lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
