//! Frame struct with typed accessors.
//!
//! Represents a complete imsg frame with header and payload.
//! Uses `bytes::Bytes` so decoded payloads can be shared without copying.
//!
//! # Example
//!
//! ```
//! use smtpd_proc::protocol::{Frame, HEADER_SIZE};
//! use bytes::Bytes;
//!
//! let frame = Frame::outgoing(0, 14, 4242, Bytes::from_static(b"hello"));
//! assert_eq!(frame.kind(), 0);
//! assert_eq!(frame.header.length as usize, HEADER_SIZE + 5);
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::codec::PayloadReader;
use crate::error::{Error, Result};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from a header and payload as received.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Create a frame to send, with `length` derived from the payload.
    ///
    /// Payloads longer than a frame can carry are caught by [`Frame::encode`].
    pub fn outgoing(kind: u32, peer_id: u32, pid: u32, payload: Bytes) -> Self {
        let length = (HEADER_SIZE + payload.len()).min(u16::MAX as usize) as u16;
        Self {
            header: Header::new(kind, length, 0, peer_id, pid),
            payload,
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Get the command type.
    #[inline]
    pub fn kind(&self) -> u32 {
        self.header.kind
    }

    /// Get the sender process id.
    #[inline]
    pub fn pid(&self) -> u32 {
        self.header.pid
    }

    /// Get the peer id.
    #[inline]
    pub fn peer_id(&self) -> u32 {
        self.header.peer_id
    }

    /// Cursor over the payload for positional decoding.
    #[inline]
    pub fn reader(&self) -> PayloadReader<'_> {
        PayloadReader::new(&self.payload)
    }

    /// Encode header and payload into one contiguous buffer.
    ///
    /// The header `length` is recomputed from the payload size, all other
    /// header fields are written as they are.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::Framing(format!(
                "payload size {} exceeds maximum {}",
                self.payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let header = Header {
            length: (HEADER_SIZE + self.payload.len()) as u16,
            ..self.header
        };

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }
}
