//! Error types for smtpd-proc.

use thiserror::Error;

use crate::codec::tag_name;

/// Main error type for all protocol operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the daemon connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The descriptor is non-blocking and had no data ready.
    ///
    /// Retryable: the serve loops swallow it and read again.
    #[error("resource temporarily unavailable")]
    WouldBlock,

    /// The daemon closed the connection in the middle of a frame.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Frame header declares an impossible length.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Not enough payload bytes left for the requested field.
    #[error("short buffer: need {needed} bytes, {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },

    /// A string field with no NUL terminator before the payload end.
    #[error("imsg: string not NUL-terminated")]
    MalformedString,

    /// Tag byte did not match the expected value type.
    #[error("mproc: expected type {}, got {}", tag_name(*.expected), tag_name(*.actual))]
    TypeMismatch { expected: u8, actual: u8 },

    /// The daemon speaks a protocol version we do not support.
    #[error("{face}: expected API version {expected}, got {actual}")]
    VersionMismatch {
        face: &'static str,
        expected: u32,
        actual: u32,
    },

    /// A command type that is not allowed in the current state.
    #[error("{face}: unexpected imsg type {kind}")]
    UnexpectedFrame { face: &'static str, kind: String },

    /// Other protocol violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A user callback failed.
    #[error("Handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary callback error.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Handler(err.into())
    }

    /// Whether the failed operation may simply be retried.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }
}

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
