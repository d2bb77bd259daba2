//! Exception information attached to a log entry
//!
//! Rust errors carry no interpreter traceback, so the traceback is assembled
//! from the frame that logged the error, optionally extended with a captured
//! [`Backtrace`].

use super::log_entry::CallSite;
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

/// Ordered traceback frames, most recent call last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traceback {
    frames: Vec<String>,
}

impl Traceback {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Traceback holding the single frame of `call_site`
    pub fn from_call_site(call_site: &CallSite) -> Self {
        let mut tb = Self::new();
        tb.push_call_site(call_site);
        tb
    }

    pub fn push_frame(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    pub fn push_call_site(&mut self, call_site: &CallSite) {
        self.frames.push(format!(
            "  File \"{}\", line {}, in {}",
            call_site.file, call_site.line, call_site.function
        ));
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// One string per source line of the formatted traceback
    pub fn lines(&self) -> Vec<String> {
        self.frames
            .iter()
            .flat_map(|frame| frame.lines())
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Traceback (most recent call last):")?;
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Captured error: (type name, message, traceback) plus an optional rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub traceback: Traceback,
    /// Messages of the `source()` chain, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ExceptionInfo {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        traceback: Traceback,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            traceback,
            causes: Vec::new(),
            text: None,
        }
    }

    /// Capture `err` as seen from `call_site`.
    ///
    /// The rendered text lists the `source()` chain below the message.
    pub fn from_error<E>(err: &E, call_site: &CallSite) -> Self
    where
        E: Error + ?Sized,
    {
        let type_name = short_type_name(std::any::type_name::<E>()).to_string();
        let mut info = Self::new(type_name, err.to_string(), Traceback::from_call_site(call_site));

        let mut source = err.source();
        while let Some(cause) = source {
            info.causes.push(cause.to_string());
            source = cause.source();
        }

        info.text = Some(info.render());
        info
    }

    /// Append the frames of a captured backtrace
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: &Backtrace) -> Self {
        if backtrace.status() == BacktraceStatus::Captured {
            self.traceback.push_frame(backtrace.to_string());
            if self.text.is_some() {
                self.text = Some(self.render());
            }
        }
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn render(&self) -> String {
        let mut out = self.traceback.to_string();
        out.push_str(&format!("{}: {}", self.type_name, self.message));
        for cause in &self.causes {
            out.push_str(&format!("\nCaused by: {}", cause));
        }
        out
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// `std::io::error::Error` -> `Error`, `Box<dyn Error>` -> `Box`
fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}
