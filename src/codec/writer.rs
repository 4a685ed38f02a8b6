//! Payload builder for outgoing frames.

use bytes::{BufMut, Bytes, BytesMut};

use super::tags;

/// Accumulates encoded values for one outgoing frame.
///
/// Only the value types the plugin ever originates are supported; socket
/// and mail addresses flow from the daemon to us, never back.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish and hand out the payload.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    // Bare encoders

    pub fn put_int(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_uint32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_size(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn put_id(&mut self, id: u64) {
        self.buf.put_u64_le(id);
    }

    /// Append `s` followed by a NUL byte.
    ///
    /// `s` must not contain NUL itself or the peer will split it.
    pub fn put_string(&mut self, s: &str) {
        debug_assert!(!s.as_bytes().contains(&0), "embedded NUL in {:?}", s);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    // Tagged encoders

    pub fn put_type(&mut self, tag: u8) {
        self.buf.put_u8(tag);
    }

    pub fn put_typed_int(&mut self, v: i32) {
        self.put_type(tags::M_INT);
        self.put_int(v);
    }

    pub fn put_typed_uint32(&mut self, v: u32) {
        self.put_type(tags::M_UINT32);
        self.put_uint32(v);
    }

    pub fn put_typed_string(&mut self, s: &str) {
        self.put_type(tags::M_STRING);
        self.put_string(s);
    }

    pub fn put_typed_id(&mut self, id: u64) {
        self.put_type(tags::M_ID);
        self.put_id(id);
    }
}
