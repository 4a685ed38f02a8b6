//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the imsg framing shared by the filter and table faces:
//! - 16-byte little-endian header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use wire_format::{Header, HEADER_SIZE, IMSG_VERSION, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
