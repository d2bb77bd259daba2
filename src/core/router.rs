//! Severity-based stream routing
//!
//! A [`StreamRouter`] holds an ordered list of [`Channel`]s. Each channel pairs
//! a minimum severity and an optional level predicate with an output target.
//! The router is generic over the target so the blocking and non-blocking
//! loggers share the same routing rules.

use super::log_level::LogLevel;
use std::fmt;
use std::sync::Arc;

/// Name of the standard output channel
pub const STDOUT_CHANNEL: &str = "stdout";
/// Name of the error output channel
pub const STDERR_CHANNEL: &str = "stderr";
/// Name of the channel used when a single explicit stream is configured
pub const STREAM_CHANNEL: &str = "stream";

/// Static per-channel predicate over severities
pub type LevelFilter = Arc<dyn Fn(LogLevel) -> bool + Send + Sync>;

/// A (severity filter, output target) pair
pub struct Channel<T> {
    name: String,
    min_level: LogLevel,
    filter: Option<LevelFilter>,
    target: T,
}

impl<T> Channel<T> {
    /// Channel accepting every severity
    pub fn new(name: impl Into<String>, target: T) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Debug,
            filter: None,
            target,
        }
    }

    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(LogLevel) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Restrict the channel to exactly `levels`
    #[must_use]
    pub fn only(self, levels: &[LogLevel]) -> Self {
        let levels = levels.to_vec();
        self.filter(move |level| levels.contains(&level))
    }

    /// Whether events at `level` are written to this channel
    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level && self.filter.as_ref().map_or(true, |f| f(level))
    }

    /// Channel name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_severity(&self) -> LogLevel {
        self.min_level
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Same routing rules, different target
    pub fn map<U, F>(self, f: F) -> Channel<U>
    where
        F: FnOnce(T) -> U,
    {
        Channel {
            name: self.name,
            min_level: self.min_level,
            filter: self.filter,
            target: f(self.target),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Routes each formatted line to every channel accepting its severity
///
/// # Example
///
/// ```
/// use rust_json_logger::core::{LogLevel, StreamRouter};
///
/// let router = StreamRouter::standard("out", "err");
///
/// let targets: Vec<_> = router.route(LogLevel::Info).map(|c| *c.target()).collect();
/// assert_eq!(targets, vec!["out"]);
///
/// let targets: Vec<_> = router.route(LogLevel::Error).map(|c| *c.target()).collect();
/// assert_eq!(targets, vec!["err"]);
/// ```
#[derive(Debug)]
pub struct StreamRouter<T> {
    channels: Vec<Channel<T>>,
}

impl<T> StreamRouter<T> {
    /// Router with no channels
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Default split: DEBUG and INFO to `stdout`, WARNING and above to `stderr`
    pub fn standard(stdout: T, stderr: T) -> Self {
        Self::new()
            .with_channel(
                Channel::new(STDOUT_CHANNEL, stdout)
                    .min_level(LogLevel::Debug)
                    .only(&[LogLevel::Debug, LogLevel::Info]),
            )
            .with_channel(Channel::new(STDERR_CHANNEL, stderr).min_level(LogLevel::Warning))
    }

    /// Every severity goes to `target`
    pub fn single(target: T) -> Self {
        Self::new().with_channel(Channel::new(STREAM_CHANNEL, target))
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Channel<T>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Register `channel` after the existing ones
    pub fn add_channel(&mut self, channel: Channel<T>) {
        self.channels.push(channel);
    }

    /// Channels accepting `level`, in registration order
    pub fn route(&self, level: LogLevel) -> impl Iterator<Item = &Channel<T>> {
        self.channels
            .iter()
            .filter(move |channel| channel.accepts(level))
    }

    /// All channels in registration order
    pub fn channels(&self) -> &[Channel<T>] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Same channels, targets transformed by `f`
    pub fn map<U, F>(self, mut f: F) -> StreamRouter<U>
    where
        F: FnMut(T) -> U,
    {
        StreamRouter {
            channels: self
                .channels
                .into_iter()
                .map(|channel| channel.map(&mut f))
                .collect(),
        }
    }

    /// Severities no channel accepts; events at these levels are dropped
    pub fn uncovered_levels(&self) -> Vec<LogLevel> {
        LogLevel::ALL
            .iter()
            .copied()
            .filter(|level| self.route(*level).next().is_none())
            .collect()
    }
}

impl<T> Default for StreamRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}
