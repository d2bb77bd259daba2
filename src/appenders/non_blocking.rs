//! Non-blocking stream writer
//!
//! A [`NonBlockingWriter`] owns one transport and one drain task. Producers
//! hand lines to an unbounded queue and return immediately; the drain task
//! writes them to the transport strictly in submission order, suspending
//! whenever the device stops accepting bytes.
//!
//! Device failures never reach the producer. The failed line is dropped,
//! counted in [`WriterMetrics`] and passed to the optional error callback.
//! A broken pipe closes the writer.

use crate::core::{Appender, AsyncAppender, LogLevel, LoggerError, Result};
use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

/// Observer for device errors hit by the drain task
pub type WriterErrorCallback = Arc<dyn Fn(&io::Error) + Send + Sync>;

/// Writer lifecycle: `Uninitialized -> Ready -> (Writing <-> Ready) -> Closed`
///
/// `Writing` is derived from the number of queued lines, so it is reported
/// exactly while at least one line has not reached the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WriterState {
    /// Transport not attached yet
    Uninitialized = 0,
    /// Attached, queue empty
    Ready = 1,
    /// Lines queued or draining
    Writing = 2,
    /// No further lines are written
    Closed = 3,
}

impl WriterState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WriterState::Uninitialized,
            1 => WriterState::Ready,
            2 => WriterState::Writing,
            _ => WriterState::Closed,
        }
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::Uninitialized => "UNINITIALIZED",
            WriterState::Ready => "READY",
            WriterState::Writing => "WRITING",
            WriterState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Per-writer counters
#[derive(Debug, Default)]
pub struct WriterMetrics {
    lines_written: AtomicU64,
    bytes_written: AtomicU64,
    lines_dropped: AtomicU64,
    write_errors: AtomicU64,
}

impl WriterMetrics {
    /// Lines fully written to the device
    #[inline]
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Lines lost to device errors or a closed writer
    #[inline]
    pub fn lines_dropped(&self) -> u64 {
        self.lines_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    fn record_written(&self, bytes: usize) {
        self.lines_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.lines_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }
}

enum WriterCommand {
    Write(Vec<u8>),
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

struct Shared {
    name: String,
    terminator: String,
    // Lifecycle only; never stores `Writing`
    state: AtomicU8,
    pending: AtomicUsize,
    metrics: WriterMetrics,
    on_error: Option<WriterErrorCallback>,
}

impl Shared {
    fn state(&self) -> WriterState {
        match WriterState::from_u8(self.state.load(Ordering::Acquire)) {
            WriterState::Ready if self.pending.load(Ordering::Acquire) > 0 => {
                WriterState::Writing
            }
            state => state,
        }
    }

    fn set_state(&self, state: WriterState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn enqueued(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    fn dequeued(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    fn fail(&self, err: &io::Error) {
        self.metrics.record_error();
        if let Some(ref callback) = self.on_error {
            callback(err);
        }
        if err.kind() == io::ErrorKind::BrokenPipe {
            self.set_state(WriterState::Closed);
        }
    }
}

/// Line writer that never blocks the producer
///
/// Clones share the same queue and transport.
///
/// # Example
///
/// ```no_run
/// use rust_json_logger::appenders::NonBlockingWriter;
///
/// # async fn example() -> rust_json_logger::Result<()> {
/// let writer = NonBlockingWriter::stdout()?;
/// writer.write_line(r#"{"msg": "hello"}"#)?;
/// writer.flush().await?;
/// writer.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NonBlockingWriter {
    shared: Arc<Shared>,
    sender: mpsc::UnboundedSender<WriterCommand>,
}

impl NonBlockingWriter {
    /// Start configuring a writer named `name`
    pub fn builder(name: impl Into<String>) -> NonBlockingWriterBuilder {
        NonBlockingWriterBuilder::new(name)
    }

    /// Writer draining into `transport`; requires a running tokio runtime
    pub fn new<W>(name: impl Into<String>, transport: W) -> Result<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::builder(name).build(transport)
    }

    /// Non-blocking writer on the process standard output
    pub fn stdout() -> Result<Self> {
        Self::builder("stdout").stdout()
    }

    /// Non-blocking writer on the process standard error
    pub fn stderr() -> Result<Self> {
        Self::builder("stderr").stderr()
    }

    /// Name used in diagnostics and errors
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> WriterState {
        self.shared.state()
    }

    /// Whether further lines are rejected
    pub fn is_closed(&self) -> bool {
        self.state() == WriterState::Closed
    }

    /// Number of lines handed over but not yet written or dropped
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Counters for this writer's device
    pub fn metrics(&self) -> &WriterMetrics {
        &self.shared.metrics
    }

    /// Queue `line` plus the terminator. Returns without touching the device.
    pub fn write_line(&self, line: &str) -> Result<()> {
        if self.is_closed() {
            self.shared.metrics.record_dropped();
            return Err(LoggerError::writer_closed(self.name()));
        }

        let mut bytes = Vec::with_capacity(line.len() + self.shared.terminator.len());
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(self.shared.terminator.as_bytes());

        self.shared.enqueued();
        self.sender
            .send(WriterCommand::Write(bytes))
            .map_err(|_| {
                self.shared.dequeued();
                self.shared.set_state(WriterState::Closed);
                self.shared.metrics.record_dropped();
                LoggerError::writer_closed(self.name())
            })
    }

    /// Resolve once every line queued before this call has drained
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriterCommand::Flush(ack))
            .map_err(|_| LoggerError::writer_closed(self.name()))?;
        done.await
            .map_err(|_| LoggerError::writer_closed(self.name()))
    }

    /// Drain pending lines, shut the transport down and stop the drain task
    pub async fn close(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        if self.sender.send(WriterCommand::Close(ack)).is_err() {
            self.shared.set_state(WriterState::Closed);
            return Ok(());
        }
        let _ = done.await;
        Ok(())
    }
}

impl fmt::Debug for NonBlockingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonBlockingWriter")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Configures a [`NonBlockingWriter`] before its transport is attached
pub struct NonBlockingWriterBuilder {
    name: String,
    terminator: String,
    on_error: Option<WriterErrorCallback>,
}

impl NonBlockingWriterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminator: "\n".to_string(),
            on_error: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: WriterErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Attach `transport` and spawn the drain task on the current runtime
    pub fn build<W>(self, transport: W) -> Result<NonBlockingWriter>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.spawn(Box::new(transport), None)
    }

    fn spawn(
        self,
        transport: Box<dyn AsyncWrite + Unpin + Send>,
        restore: Option<RestoreFlags>,
    ) -> Result<NonBlockingWriter> {
        let handle = runtime_handle(&self.name)?;
        let shared = Arc::new(Shared {
            name: self.name,
            terminator: self.terminator,
            state: AtomicU8::new(WriterState::Uninitialized as u8),
            pending: AtomicUsize::new(0),
            metrics: WriterMetrics::default(),
            on_error: self.on_error,
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = DrainTask {
            receiver,
            transport,
            shared: Arc::clone(&shared),
            restore,
        };
        handle.spawn(task.run());
        shared.set_state(WriterState::Ready);

        Ok(NonBlockingWriter { shared, sender })
    }

    /// Attach to a duplicate of the standard output descriptor
    pub fn stdout(self) -> Result<NonBlockingWriter> {
        runtime_handle(&self.name)?;
        #[cfg(unix)]
        {
            use std::os::fd::AsFd;
            match sys::register(io::stdout().as_fd()) {
                Ok((pipe, restore)) => return self.spawn(Box::new(pipe), restore),
                Err(e) => eprintln!(
                    "[LOGGER WARNING] stdout cannot be registered as non-blocking ({}); \
                     falling back to a blocking-pool writer.",
                    e
                ),
            }
        }
        self.build(tokio::io::stdout())
    }

    /// Attach to a duplicate of the standard error descriptor
    pub fn stderr(self) -> Result<NonBlockingWriter> {
        runtime_handle(&self.name)?;
        #[cfg(unix)]
        {
            use std::os::fd::AsFd;
            match sys::register(io::stderr().as_fd()) {
                Ok((pipe, restore)) => return self.spawn(Box::new(pipe), restore),
                Err(e) => eprintln!(
                    "[LOGGER WARNING] stderr cannot be registered as non-blocking ({}); \
                     falling back to a blocking-pool writer.",
                    e
                ),
            }
        }
        self.build(tokio::io::stderr())
    }
}

#[cfg(unix)]
use sys::RestoreFlags;

#[cfg(not(unix))]
type RestoreFlags = std::convert::Infallible;

fn runtime_handle(name: &str) -> Result<Handle> {
    Handle::try_current().map_err(|_| {
        LoggerError::config(
            format!("NonBlockingWriter '{}'", name),
            "must be created inside a tokio runtime",
        )
    })
}

struct DrainTask {
    receiver: mpsc::UnboundedReceiver<WriterCommand>,
    transport: Box<dyn AsyncWrite + Unpin + Send>,
    shared: Arc<Shared>,
    // Dropped with the task, after the transport is shut down
    restore: Option<RestoreFlags>,
}

impl DrainTask {
    async fn run(mut self) {
        let mut closed_ack = None;
        while let Some(command) = self.receiver.recv().await {
            match command {
                WriterCommand::Write(bytes) => {
                    self.write(&bytes).await;
                    self.shared.dequeued();
                    if self.receiver.is_empty() {
                        self.flush().await;
                    }
                }
                WriterCommand::Flush(ack) => {
                    self.flush().await;
                    let _ = ack.send(());
                }
                WriterCommand::Close(ack) => {
                    self.flush().await;
                    let _ = self.transport.shutdown().await;
                    closed_ack = Some(ack);
                    break;
                }
            }
        }

        self.shared.set_state(WriterState::Closed);
        self.receiver.close();
        while let Ok(command) = self.receiver.try_recv() {
            if let WriterCommand::Write(_) = command {
                self.shared.metrics.record_dropped();
                self.shared.dequeued();
            }
        }
        drop(self.restore.take());
        if let Some(ack) = closed_ack {
            let _ = ack.send(());
        }
    }

    async fn write(&mut self, bytes: &[u8]) {
        if self.shared.state() == WriterState::Closed {
            self.shared.metrics.record_dropped();
            return;
        }
        match self.transport.write_all(bytes).await {
            Ok(()) => self.shared.metrics.record_written(bytes.len()),
            Err(e) => {
                self.shared.metrics.record_dropped();
                self.shared.fail(&e);
            }
        }
    }

    async fn flush(&mut self) {
        if self.shared.state() == WriterState::Closed {
            return;
        }
        if let Err(e) = self.transport.flush().await {
            self.shared.fail(&e);
        }
    }
}

impl Appender for NonBlockingWriter {
    fn append(&mut self, line: &str, _level: LogLevel) -> Result<()> {
        self.write_line(line)
    }

    /// Lines drain on their own; waiting for them needs `flush().await`
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

#[async_trait]
impl AsyncAppender for NonBlockingWriter {
    fn append(&self, line: &str, _level: LogLevel) -> Result<()> {
        self.write_line(line)
    }

    async fn flush(&self) -> Result<()> {
        NonBlockingWriter::flush(self).await
    }

    async fn close(&self) -> Result<()> {
        NonBlockingWriter::close(self).await
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

#[cfg(unix)]
mod sys {
    use std::fs::File;
    use std::io;
    use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
    use tokio::net::unix::pipe;

    /// Puts the original status flags back on the shared file description
    pub(crate) struct RestoreFlags {
        fd: OwnedFd,
        flags: libc::c_int,
    }

    impl Drop for RestoreFlags {
        fn drop(&mut self) {
            // SAFETY: `self.fd` is an open descriptor owned by the guard.
            let rc = unsafe { libc::fcntl(self.fd.as_raw_fd(), libc::F_SETFL, self.flags) };
            if rc < 0 {
                eprintln!(
                    "[LOGGER WARNING] could not restore descriptor flags: {}",
                    io::Error::last_os_error()
                );
            }
        }
    }

    /// Duplicate `fd`, mark it non-blocking and register it with the reactor.
    ///
    /// The duplicate shares its file description with `fd`, so the returned
    /// guard is `Some` whenever the flag had to be set and must outlive the
    /// sender.
    pub(super) fn register(
        fd: BorrowedFd<'_>,
    ) -> io::Result<(pipe::Sender, Option<RestoreFlags>)> {
        let owned = fd.try_clone_to_owned()?;
        let restore = set_nonblocking(&owned)?;
        let sender = pipe::Sender::from_file_unchecked(File::from(owned))?;
        Ok((sender, restore))
    }

    pub(super) fn status_flags(fd: BorrowedFd<'_>) -> io::Result<libc::c_int> {
        // SAFETY: `fd` is borrowed, so it stays open for the call.
        let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(flags)
    }

    fn set_nonblocking(fd: &OwnedFd) -> io::Result<Option<RestoreFlags>> {
        use std::os::fd::AsFd;

        let flags = status_flags(fd.as_fd())?;
        if flags & libc::O_NONBLOCK != 0 {
            return Ok(None);
        }
        let guard = RestoreFlags {
            fd: fd.try_clone()?,
            flags,
        };
        // SAFETY: `fd` is open for the duration of the call.
        let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Some(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::pin::Pin;
    use std::sync::atomic::AtomicUsize;
    use std::task::{Context, Poll};

    /// Alternates between refusing bytes and accepting a few of them
    struct ChokingDevice {
        data: Arc<Mutex<Vec<u8>>>,
        refuse_next: bool,
        chunk: usize,
    }

    impl AsyncWrite for ChokingDevice {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.refuse_next {
                self.refuse_next = false;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            self.refuse_next = true;
            let n = buf.len().min(self.chunk);
            self.data.lock().extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Never accepts a byte and never wakes the writer
    struct StalledDevice;

    impl AsyncWrite for StalledDevice {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    struct BrokenDevice;

    impl AsyncWrite for BrokenDevice {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_order_preserved_on_choking_device() {
        let data = Arc::new(Mutex::new(Vec::new()));
        let device = ChokingDevice {
            data: Arc::clone(&data),
            refuse_next: true,
            chunk: 3,
        };
        let writer = NonBlockingWriter::new("choking", device).unwrap();

        for i in 0..200 {
            writer.write_line(&format!("line {}", i)).unwrap();
        }
        writer.flush().await.unwrap();

        let written = String::from_utf8(data.lock().clone()).unwrap();
        let expected: Vec<String> = (0..200).map(|i| format!("line {}", i)).collect();
        assert_eq!(written.lines().collect::<Vec<_>>(), expected);
        assert_eq!(writer.metrics().lines_written(), 200);
    }

    #[tokio::test]
    async fn test_exact_bytes_with_mock_device() {
        let device = tokio_test::io::Builder::new()
            .write(b"{\"msg\":\"a\"}\n")
            .write(b"{\"msg\":\"b\"}\n")
            .build();
        let writer = NonBlockingWriter::new("mock", device).unwrap();

        writer.write_line(r#"{"msg":"a"}"#).unwrap();
        writer.write_line(r#"{"msg":"b"}"#).unwrap();
        writer.close().await.unwrap();

        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(writer.metrics().bytes_written(), 24);
    }

    #[tokio::test]
    async fn test_handoff_never_waits_on_device() {
        let writer = NonBlockingWriter::new("stalled", StalledDevice).unwrap();

        for _ in 0..1_000 {
            writer.write_line("queued").unwrap();
        }

        assert_eq!(writer.state(), WriterState::Writing);
        assert_eq!(writer.metrics().lines_written(), 0);
    }

    #[tokio::test]
    async fn test_broken_pipe_closes_writer() {
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_clone = Arc::clone(&errors);
        let writer = NonBlockingWriter::builder("broken")
            .on_error(Arc::new(move |err| {
                assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
                errors_clone.fetch_add(1, Ordering::Relaxed);
            }))
            .build(BrokenDevice)
            .unwrap();

        writer.write_line("lost").unwrap();
        writer.flush().await.unwrap();

        assert_eq!(errors.load(Ordering::Relaxed), 1);
        assert!(writer.is_closed());
        assert_eq!(writer.metrics().write_errors(), 1);
        assert_eq!(writer.metrics().lines_dropped(), 1);

        let err = writer.write_line("after").unwrap_err();
        assert!(matches!(err, LoggerError::WriterClosed { .. }));
    }

    #[tokio::test]
    async fn test_state_tracks_pending_lines() {
        let writer = NonBlockingWriter::new("sink", tokio::io::sink()).unwrap();
        assert_eq!(writer.state(), WriterState::Ready);

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let writer = writer.clone();
                tokio::spawn(async move {
                    for i in 0..250 {
                        writer.write_line(&format!("line {}", i)).unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        writer.flush().await.unwrap();

        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.state(), WriterState::Ready);
        assert_eq!(writer.metrics().lines_written(), 1_000);
    }

    #[tokio::test]
    async fn test_stalled_writer_reports_pending() {
        let writer = NonBlockingWriter::new("stalled", StalledDevice).unwrap();
        writer.write_line("a").unwrap();
        writer.write_line("b").unwrap();

        assert_eq!(writer.pending(), 2);
        assert_eq!(writer.state(), WriterState::Writing);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_restores_blocking_mode() {
        use std::os::fd::AsFd;
        use std::os::unix::net::UnixStream;

        let (local, _peer) = UnixStream::pair().unwrap();
        let before = sys::status_flags(local.as_fd()).unwrap();
        assert_eq!(before & libc::O_NONBLOCK, 0);

        let (pipe, restore) = sys::register(local.as_fd()).unwrap();
        assert!(restore.is_some());
        assert_ne!(sys::status_flags(local.as_fd()).unwrap() & libc::O_NONBLOCK, 0);

        let writer = NonBlockingWriter::builder("socket")
            .spawn(Box::new(pipe), restore)
            .unwrap();
        writer.write_line("hello").unwrap();
        writer.close().await.unwrap();

        assert_eq!(sys::status_flags(local.as_fd()).unwrap() & libc::O_NONBLOCK, 0);
        assert_eq!(writer.metrics().lines_written(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_already_nonblocking_needs_no_restore() {
        use std::os::fd::AsFd;
        use std::os::unix::net::UnixStream;

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _enter = runtime.enter();
        let (local, _peer) = UnixStream::pair().unwrap();
        local.set_nonblocking(true).unwrap();

        let (_pipe, restore) = sys::register(local.as_fd()).unwrap();
        assert!(restore.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_writes() {
        let writer = NonBlockingWriter::new("sink", tokio::io::sink()).unwrap();
        writer.write_line("x").unwrap();

        writer.close().await.unwrap();
        writer.close().await.unwrap();

        assert!(writer.is_closed());
        assert!(writer.write_line("y").is_err());
        assert!(writer.flush().await.is_err());
        assert_eq!(writer.metrics().lines_written(), 1);
    }

    #[tokio::test]
    async fn test_custom_terminator() {
        let device = tokio_test::io::Builder::new().write(b"x\r\n").build();
        let writer = NonBlockingWriter::builder("crlf")
            .terminator("\r\n")
            .build(device)
            .unwrap();

        writer.write_line("x").unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_async_appender_contract() {
        let data = Arc::new(Mutex::new(Vec::new()));
        let device = ChokingDevice {
            data: Arc::clone(&data),
            refuse_next: false,
            chunk: 64,
        };
        let writer: Arc<dyn AsyncAppender> =
            Arc::new(NonBlockingWriter::new("trait", device).unwrap());

        writer.append("one", LogLevel::Info).unwrap();
        writer.append("two", LogLevel::Error).unwrap();
        AsyncAppender::flush(writer.as_ref()).await.unwrap();

        assert_eq!(String::from_utf8(data.lock().clone()).unwrap(), "one\ntwo\n");
        assert_eq!(writer.name(), "trait");
    }

    #[test]
    fn test_requires_runtime() {
        let err = NonBlockingWriter::new("orphan", tokio::io::sink()).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WriterState::Writing.to_string(), "WRITING");
        assert_eq!(WriterState::from_u8(9), WriterState::Closed);
    }
}
