//! Payload cursor for positional decoding.

use super::address::{MailAddr, Sockaddr, MAILADDR_SIZE};
use super::tags;
use crate::error::{Error, Result};

/// Read cursor over a frame payload.
///
/// Every getter advances the cursor past the value it decoded. On error the
/// cursor position is unspecified; the frame should be discarded.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the whole payload has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::ShortBuffer {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    // Bare decoders

    pub fn get_int(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn get_uint32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn get_size(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn get_id(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read a NUL-terminated string and step over the terminator.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; SMTP input is not
    /// guaranteed to be clean.
    pub fn get_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::MalformedString)?;
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(s)
    }

    /// Read a size-prefixed raw socket address.
    pub fn get_sockaddr(&mut self) -> Result<Sockaddr> {
        let len = self.get_size()?;
        let len = usize::try_from(len).map_err(|_| Error::ShortBuffer {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        Ok(Sockaddr::from_bytes(self.take(len)?))
    }

    /// Read the fixed 512-byte local-part/domain window.
    pub fn get_mailaddr(&mut self) -> Result<MailAddr> {
        Ok(MailAddr::from_wire(self.take(MAILADDR_SIZE)?))
    }

    // Tagged decoders

    /// Consume one tag byte and check it against `expected`.
    pub fn get_type(&mut self, expected: u8) -> Result<()> {
        let [actual] = self.take_array::<1>()?;
        if actual != expected {
            return Err(Error::TypeMismatch { expected, actual });
        }
        Ok(())
    }

    pub fn get_typed_int(&mut self) -> Result<i32> {
        self.get_type(tags::M_INT)?;
        self.get_int()
    }

    pub fn get_typed_uint32(&mut self) -> Result<u32> {
        self.get_type(tags::M_UINT32)?;
        self.get_uint32()
    }

    pub fn get_typed_size(&mut self) -> Result<u64> {
        self.get_type(tags::M_SIZET)?;
        self.get_size()
    }

    pub fn get_typed_string(&mut self) -> Result<String> {
        self.get_type(tags::M_STRING)?;
        self.get_string()
    }

    pub fn get_typed_id(&mut self) -> Result<u64> {
        self.get_type(tags::M_ID)?;
        self.get_id()
    }

    pub fn get_typed_sockaddr(&mut self) -> Result<Sockaddr> {
        self.get_type(tags::M_SOCKADDR)?;
        self.get_sockaddr()
    }

    pub fn get_typed_mailaddr(&mut self) -> Result<MailAddr> {
        self.get_type(tags::M_MAILADDR)?;
        self.get_mailaddr()
    }
}
