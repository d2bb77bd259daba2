//! Logging macros that capture the full call site.
//!
//! Unlike the plain logger methods, these macros record the name of the
//! enclosing function, so `function` and exception tracebacks name it.
//! They work with both [`Logger`](crate::Logger) (returning `Result<()>`) and
//! [`AsyncLogger`](crate::AsyncLogger) (returning a future to `.await`).
//!
//! # Examples
//!
//! ```
//! use rust_json_logger::prelude::*;
//! use rust_json_logger::{info, warning};
//!
//! let buffer = SharedBuffer::new();
//! let logger = Logger::builder()
//!     .stream(StreamAppender::new("memory", buffer.clone()))
//!     .build();
//!
//! info!(logger, "Server started").unwrap();
//!
//! let port = 8080;
//! warning!(logger, { "port" => port }, "Port {} already bound", port).unwrap();
//!
//! assert!(buffer.contents().contains("\"port\":8080"));
//! ```

/// Current source location, including the enclosing function's name.
///
/// ```
/// use rust_json_logger::call_site;
///
/// fn handler() -> rust_json_logger::core::CallSite {
///     call_site!()
/// }
///
/// assert_eq!(handler().function, "handler");
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::core::CallSite::new(file!(), line!(), {
            fn __here() {}
            fn __type_name_of<T>(_: T) -> &'static str {
                ::std::any::type_name::<T>()
            }
            let name = __type_name_of(__here);
            name.strip_suffix("::__here").unwrap_or(name)
        })
    };
}

/// Build an ordered [`Fields`](crate::core::Fields) map.
///
/// ```
/// use rust_json_logger::fields;
///
/// let song = fields! { "artist" => "X", "song" => "Y" };
/// assert_eq!(song.keys().collect::<Vec<_>>(), vec!["artist", "song"]);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::core::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::core::Fields::new()$(.with($key, $value))+
    };
}

/// Log a formatted message, optionally with extra root-level fields.
///
/// ```
/// # use rust_json_logger::prelude::*;
/// # let logger = Logger::builder().stream(StreamAppender::new("m", SharedBuffer::new())).build();
/// use rust_json_logger::log;
/// log!(logger, LogLevel::Info, "Simple message").unwrap();
/// log!(logger, LogLevel::Error, { "code" => 500 }, "Request failed: {}", "timeout").unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, { $($key:expr => $value:expr),* $(,)? }, $($arg:tt)+) => {
        $logger.log_with(
            $level,
            format!($($arg)+),
            $crate::core::LogOptions::new()
                .at($crate::call_site!())
                $(.extra($key, $value))*,
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_with(
            $level,
            format!($($arg)+),
            $crate::core::LogOptions::new().at($crate::call_site!()),
        )
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log an error-level message with `err` attached as exception info.
///
/// The traceback names the function the macro was invoked in.
///
/// ```
/// # use rust_json_logger::prelude::*;
/// # let buffer = SharedBuffer::new();
/// # let logger = Logger::builder().stream(StreamAppender::new("m", buffer.clone())).build();
/// use rust_json_logger::exception;
///
/// fn load(logger: &Logger) {
///     let err = std::io::Error::new(std::io::ErrorKind::NotFound, "settings.toml");
///     exception!(logger, err, "could not load settings").unwrap();
/// }
///
/// load(&logger);
/// assert!(buffer.contents().contains("in load"));
/// ```
#[macro_export]
macro_rules! exception {
    ($logger:expr, $err:expr, $($arg:tt)+) => {
        $logger.exception_with(
            format!($($arg)+),
            &$err,
            $crate::core::LogOptions::new().at($crate::call_site!()),
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::appenders::{SharedBuffer, StreamAppender};
    use crate::core::{Logger, LogLevel};
    use serde_json::Value;

    fn logger() -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::builder()
            .stream(StreamAppender::new("memory", buffer.clone()))
            .build();
        (logger, buffer)
    }

    fn last(buffer: &SharedBuffer) -> Value {
        serde_json::from_str(buffer.lines().last().unwrap()).unwrap()
    }

    #[test]
    fn test_call_site_names_function() {
        fn outer_function() -> crate::core::CallSite {
            call_site!()
        }
        let site = outer_function();
        assert_eq!(site.function, "outer_function");
        assert!(site.file.ends_with("macros.rs"));
    }

    #[test]
    fn test_call_site_inside_closure() {
        let site = (|| call_site!())();
        assert_eq!(site.function, "test_call_site_inside_closure");
    }

    #[test]
    fn test_log_macro_records_function() {
        let (logger, buffer) = logger();
        log!(logger, LogLevel::Info, "Formatted: {}", 42).unwrap();

        let doc = last(&buffer);
        assert_eq!(doc["msg"], "Formatted: 42");
        assert_eq!(doc["function"], "test_log_macro_records_function");
    }

    #[test]
    fn test_level_macros() {
        let (logger, buffer) = logger();
        debug!(logger, "d").unwrap();
        info!(logger, "i").unwrap();
        warning!(logger, "w").unwrap();
        error!(logger, "e").unwrap();
        critical!(logger, "c {}", 1).unwrap();

        let levels: Vec<String> = buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["level"].to_string())
            .collect();
        assert_eq!(
            levels,
            vec!["\"DEBUG\"", "\"INFO\"", "\"WARNING\"", "\"ERROR\"", "\"CRITICAL\""]
        );
    }

    #[test]
    fn test_extra_fields_form() {
        let (logger, buffer) = logger();
        info!(logger, { "user" => "ana", "attempt" => 2 }, "login").unwrap();

        let doc = last(&buffer);
        assert_eq!(doc["user"], "ana");
        assert_eq!(doc["attempt"], 2);
        assert_eq!(doc["msg"], "login");
    }

    #[test]
    fn test_exception_macro_traceback() {
        let (logger, buffer) = logger();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        exception!(logger, err, "failed: {}", "step 3").unwrap();

        let doc = last(&buffer);
        assert_eq!(doc["exc_info"][1], "Exception: boom");
        let frames = doc["exc_info"][2].as_array().unwrap();
        assert!(frames
            .iter()
            .any(|f| f.as_str().unwrap().contains("test_exception_macro_traceback")));
    }

    #[test]
    fn test_fields_macro() {
        let fields = fields! { "a" => 1, "b" => "two", };
        assert_eq!(fields.len(), 2);
        assert!(fields!().is_empty());
    }
}
