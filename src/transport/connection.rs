//! Frame I/O over the daemon's pre-opened descriptor.
//!
//! The daemon hands each plugin one end of a socketpair as file descriptor 0.
//! [`Connection`] reads and writes whole frames on any
//! `AsyncRead`/`AsyncWrite` pair, so tests can drive it over in-memory pipes.
//!
//! # Example
//!
//! ```ignore
//! use smtpd_proc::transport::InheritedConnection;
//!
//! let mut conn = InheritedConnection::inherited()?;
//! while let Some(frame) = conn.read_frame().await? {
//!     // dispatch
//! }
//! ```

use std::collections::VecDeque;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameBuffer, MAX_FRAME_SIZE};

/// Descriptor the daemon connects to the plugin (standard input).
pub const INHERITED_FD: i32 = 0;

/// A framed, bidirectional connection to the daemon.
pub struct Connection<R, W> {
    reader: R,
    writer: W,
    buffer: FrameBuffer,
    ready: VecDeque<Frame>,
    read_buf: Vec<u8>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a read half and a write half.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buffer: FrameBuffer::new(),
            ready: VecDeque::new(),
            read_buf: vec![0u8; MAX_FRAME_SIZE],
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` for a frame
    /// - `Ok(None)` when the daemon closed the stream between frames
    /// - `Err(Error::WouldBlock)` when a non-blocking descriptor had nothing
    ///   to offer; call again
    /// - any other error when the stream is unusable
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }

            let n = match self.reader.read(&mut self.read_buf).await {
                Ok(0) if self.buffer.is_empty() => return Ok(None),
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Err(Error::WouldBlock),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };

            let frames = self.buffer.push(&self.read_buf[..n])?;
            self.ready.extend(frames);
        }
    }

    /// Like [`read_frame`](Self::read_frame), but yields to the runtime and
    /// reads again instead of reporting `WouldBlock`.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.read_frame().await {
                Err(e) if e.is_retryable() => tokio::task::yield_now().await,
                other => return other,
            }
        }
    }

    /// Write one frame and flush it.
    ///
    /// The header length is recomputed from the payload. A short write is
    /// an error; nothing is retried.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode()?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Give back the underlying halves.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io::stdin;
    use std::os::fd::{AsFd, OwnedFd};

    use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::UnixStream;

    use super::Connection;
    use crate::error::Result;

    /// Connection over the socket the daemon left on descriptor 0.
    pub type InheritedConnection = Connection<OwnedReadHalf, OwnedWriteHalf>;

    impl InheritedConnection {
        /// Take over descriptor 0.
        ///
        /// The descriptor is duplicated, so standard input itself stays
        /// untouched. Must be called from inside a tokio runtime.
        pub fn inherited() -> Result<Self> {
            let fd = stdin().as_fd().try_clone_to_owned()?;
            Self::from_fd(fd)
        }

        /// Wrap an owned descriptor of a connected Unix socket.
        pub fn from_fd(fd: OwnedFd) -> Result<Self> {
            let std_stream = std::os::unix::net::UnixStream::from(fd);
            std_stream.set_nonblocking(true)?;
            let stream = UnixStream::from_std(std_stream)?;
            let (reader, writer) = stream.into_split();
            Ok(Connection::new(reader, writer))
        }
    }
}

#[cfg(unix)]
pub use unix_impl::InheritedConnection;
