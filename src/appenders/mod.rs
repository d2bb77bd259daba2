//! Output devices for formatted lines

pub mod stream;

#[cfg(feature = "async-appenders")]
pub mod non_blocking;

pub use stream::{SharedBuffer, StreamAppender};

#[cfg(feature = "async-appenders")]
pub use non_blocking::{
    NonBlockingWriter, NonBlockingWriterBuilder, WriterErrorCallback, WriterMetrics, WriterState,
};

pub use crate::core::Appender;
#[cfg(feature = "async-appenders")]
pub use crate::core::AsyncAppender;
