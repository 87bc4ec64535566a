//! Type-tagged message framing for the device protocol.
//!
//! Every message on the wire is framed with:
//! - A 4-byte magic number (`DE AD BE EF`) for stream synchronization
//! - A 1-byte frame type (high bit set on device responses)
//! - A 2-byte little-endian payload length
//!
//! Payloads are opaque to the codec. [`payload`] interprets them as the
//! fixed-layout structures and text messages the device speaks.

pub mod codec;
pub mod error;
pub mod payload;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameType, HEADER_SIZE, MAGIC, MAX_PAYLOAD};
pub use error::{FrameError, Result};
pub use payload::{
    DeviceInfo, FixedLayout, MemoryReadRequest, MAX_LAYOUT_SIZE, MESSAGE_TERMINATOR,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
