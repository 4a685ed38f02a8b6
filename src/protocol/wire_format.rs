//! Wire format encoding and decoding.
//!
//! Implements the 16-byte imsg header:
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────┐
//! │ Type     │ Length   │ Flags    │ Peer ID  │ PID      │
//! │ 4 bytes  │ 2 bytes  │ 2 bytes  │ 4 bytes  │ 4 bytes  │
//! │ uint32 LE│ uint16 LE│ uint16 LE│ uint32 LE│ uint32 LE│
//! └──────────┴──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Little Endian, the daemon's native order.
//! `Length` counts the header itself plus the payload.

use crate::error::{Error, Result};

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Largest frame the daemon will send or accept, header included.
pub const MAX_FRAME_SIZE: usize = 16384;

/// Largest payload that fits in a frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Peer ID stamped on outgoing frames (the daemon's imsg version).
pub const IMSG_VERSION: u32 = 14;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Command or event discriminant.
    pub kind: u32,
    /// Total frame length including this header.
    pub length: u16,
    /// Unused by the protocol, preserved as received.
    pub flags: u16,
    /// Protocol/peer version tag.
    pub peer_id: u32,
    /// Sender process id.
    pub pid: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(kind: u32, length: u16, flags: u16, peer_id: u32, pid: u32) -> Self {
        Self {
            kind,
            length,
            flags,
            peer_id,
            pid,
        }
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use smtpd_proc::protocol::Header;
    ///
    /// let header = Header::new(2, 16, 0, 14, 4242);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 16);
    /// assert_eq!(bytes[0], 2);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (16 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.kind.to_le_bytes());
        buf[4..6].copy_from_slice(&self.length.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..12].copy_from_slice(&self.peer_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.pid.to_le_bytes());
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            kind: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            length: u16::from_le_bytes([buf[4], buf[5]]),
            flags: u16::from_le_bytes([buf[6], buf[7]]),
            peer_id: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            pid: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Validate the declared length.
    ///
    /// Checks:
    /// - Length covers at least the header
    /// - Length doesn't exceed [`MAX_FRAME_SIZE`]
    pub fn validate(&self) -> Result<()> {
        let length = self.length as usize;
        if length < HEADER_SIZE {
            return Err(Error::Framing(format!(
                "frame length {} shorter than header size {}",
                length, HEADER_SIZE
            )));
        }
        if length > MAX_FRAME_SIZE {
            return Err(Error::Framing(format!(
                "frame length {} exceeds maximum {}",
                length, MAX_FRAME_SIZE
            )));
        }
        Ok(())
    }

    /// Payload size implied by `length`.
    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }
}
