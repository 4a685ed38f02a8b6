//! Value codec for imsg payloads.
//!
//! Payloads are positional: values are read back in exactly the order they
//! were written. Each value comes in two forms:
//!
//! - **bare**: just the little-endian encoding of the value
//! - **tagged**: a one-byte mproc type tag followed by the bare encoding
//!
//! Tags do not make the payload self-describing; they exist to catch a
//! desynchronized stream. A tag mismatch is always fatal.
//!
//! # Example
//!
//! ```
//! use smtpd_proc::codec::{PayloadReader, PayloadWriter};
//!
//! let mut w = PayloadWriter::new();
//! w.put_typed_id(7);
//! w.put_typed_string("example.com");
//! let payload = w.freeze();
//!
//! let mut r = PayloadReader::new(&payload);
//! assert_eq!(r.get_typed_id().unwrap(), 7);
//! assert_eq!(r.get_typed_string().unwrap(), "example.com");
//! ```

mod address;
mod reader;
mod writer;

pub use address::{MailAddr, Sockaddr, DOMAIN_PART_SIZE, LOCAL_PART_SIZE, MAILADDR_SIZE};
pub use reader::PayloadReader;
pub use writer::PayloadWriter;

/// mproc value type tags.
pub mod tags {
    pub const M_INT: u8 = 0;
    pub const M_UINT32: u8 = 1;
    pub const M_SIZET: u8 = 2;
    pub const M_TIME: u8 = 3;
    pub const M_STRING: u8 = 4;
    pub const M_DATA: u8 = 5;
    pub const M_ID: u8 = 6;
    pub const M_EVPID: u8 = 7;
    pub const M_MSGID: u8 = 8;
    pub const M_SOCKADDR: u8 = 9;
    pub const M_MAILADDR: u8 = 10;
    pub const M_ENVELOPE: u8 = 11;
}

/// Printable name of an mproc type tag.
pub fn tag_name(tag: u8) -> String {
    let name = match tag {
        tags::M_INT => "M_INT",
        tags::M_UINT32 => "M_UINT32",
        tags::M_SIZET => "M_SIZET",
        tags::M_TIME => "M_TIME",
        tags::M_STRING => "M_STRING",
        tags::M_DATA => "M_DATA",
        tags::M_ID => "M_ID",
        tags::M_EVPID => "M_EVPID",
        tags::M_MSGID => "M_MSGID",
        tags::M_SOCKADDR => "M_SOCKADDR",
        tags::M_MAILADDR => "M_MAILADDR",
        tags::M_ENVELOPE => "M_ENVELOPE",
        other => return format!("UNKNOWN {}", other),
    };
    name.to_string()
}
