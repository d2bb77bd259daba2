//! Error types for the logger system

use std::sync::Arc;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Opt-in observer for failures the logger otherwise absorbs
///
/// Invoked with the failure after it has been counted in the metrics.
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// The document could not be encoded, even after the default encoder ran
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// JSON serializer error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Writer already closed
    #[error("Writer '{name}' is closed")]
    WriterClosed { name: String },

    /// Device-specific failure reported by a custom appender
    #[error("Writer error: {0}")]
    WriterError(String),
}

impl LoggerError {
    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        LoggerError::Serialization {
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a writer closed error
    pub fn writer_closed(name: impl Into<String>) -> Self {
        LoggerError::WriterClosed { name: name.into() }
    }

    /// Create a writer error for a custom appender
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Whether this error belongs to the serialization family.
    ///
    /// Only these surface to the log call site; device failures are absorbed
    /// by the writer boundary.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            LoggerError::Serialization { .. } | LoggerError::JsonError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::serialization("recursion limit exceeded");
        assert!(matches!(err, LoggerError::Serialization { .. }));

        let err = LoggerError::config("StreamRouter", "no channels");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::writer_closed("stdout");
        assert!(matches!(err, LoggerError::WriterClosed { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::serialization("recursion limit exceeded");
        assert_eq!(
            err.to_string(),
            "Serialization failed: recursion limit exceeded"
        );

        let err = LoggerError::config("LoggerConfig", "unknown field 'path'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for LoggerConfig: unknown field 'path'"
        );

        let err = LoggerError::writer_closed("stderr");
        assert_eq!(err.to_string(), "Writer 'stderr' is closed");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = LoggerError::io_operation("draining stdout", "transport rejected write", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("draining stdout"));
        assert!(!err.is_serialization());
    }

    #[test]
    fn test_is_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(LoggerError::from(json_err).is_serialization());
        assert!(LoggerError::serialization("cycle").is_serialization());
        assert!(!LoggerError::writer("device gone").is_serialization());
    }
}
