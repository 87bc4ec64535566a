//! Typed views over frame payloads.
//!
//! Each fixed-layout structure decodes its own fields at explicit offsets
//! with explicit byte order. The two structures the device speaks do not
//! agree: [`DeviceInfo`] is big-endian, [`MemoryReadRequest`] is
//! little-endian. Both must stay that way.

use std::borrow::Cow;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{Frame, FrameType};
use crate::error::Result;

/// Upper bound on the encoded size of any [`FixedLayout`].
pub const MAX_LAYOUT_SIZE: usize = 4096;

const _: () = assert!(MAX_LAYOUT_SIZE <= crate::codec::MAX_PAYLOAD);

/// Trailing byte the firmware appends to every text message.
pub const MESSAGE_TERMINATOR: u8 = 0;

/// A structure with a fixed wire layout carried as a frame payload.
pub trait FixedLayout: Sized {
    /// Number of payload bytes the structure occupies.
    const ENCODED_SIZE: usize;

    /// Frame type this structure is sent as.
    const FRAME_TYPE: FrameType;

    /// Decode from exactly `ENCODED_SIZE` bytes.
    fn decode_fields(bytes: &[u8]) -> Self;

    /// Append exactly `ENCODED_SIZE` bytes.
    fn encode_fields(&self, dst: &mut BytesMut);

    /// Wrap the encoded structure in a frame of type `FRAME_TYPE`.
    ///
    /// The payload is always exactly `ENCODED_SIZE` bytes. Layouts larger
    /// than [`MAX_LAYOUT_SIZE`] fail to compile when this is instantiated.
    fn to_frame(&self) -> Frame {
        const {
            assert!(
                Self::ENCODED_SIZE <= MAX_LAYOUT_SIZE,
                "FixedLayout::ENCODED_SIZE exceeds MAX_LAYOUT_SIZE"
            )
        };
        let mut buf = BytesMut::with_capacity(Self::ENCODED_SIZE);
        self.encode_fields(&mut buf);
        debug_assert_eq!(buf.len(), Self::ENCODED_SIZE);
        buf.resize(Self::ENCODED_SIZE, 0);
        Frame::from_parts(Self::FRAME_TYPE, Self::ENCODED_SIZE as u16, buf.freeze())
    }
}

/// Device identity returned for a DeviceInfoRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub chip_id: u32,
}

impl FixedLayout for DeviceInfo {
    const ENCODED_SIZE: usize = 4;
    const FRAME_TYPE: FrameType = FrameType::DeviceInfoResponse;

    fn decode_fields(mut bytes: &[u8]) -> Self {
        Self {
            chip_id: bytes.get_u32(),
        }
    }

    fn encode_fields(&self, dst: &mut BytesMut) {
        dst.put_u32(self.chip_id);
    }
}

/// A region of device memory to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReadRequest {
    pub address: u32,
    pub length: u32,
}

impl FixedLayout for MemoryReadRequest {
    const ENCODED_SIZE: usize = 8;
    const FRAME_TYPE: FrameType = FrameType::MemoryReadRequest;

    fn decode_fields(mut bytes: &[u8]) -> Self {
        let address = bytes.get_u32_le();
        let length = bytes.get_u32_le();
        Self { address, length }
    }

    fn encode_fields(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.address);
        dst.put_u32_le(self.length);
    }
}

impl Frame {
    /// Interpret the leading payload bytes as `T`.
    ///
    /// Returns `None` when the payload is shorter than `T` (or `T` is outside
    /// the 1..=[`MAX_LAYOUT_SIZE`] bound). Trailing bytes are ignored. The
    /// frame type is not checked; callers match on it first.
    pub fn interpret<T: FixedLayout>(&self) -> Option<T> {
        let size = T::ENCODED_SIZE;
        if size == 0 || size > MAX_LAYOUT_SIZE || self.payload.len() < size {
            return None;
        }
        Some(T::decode_fields(&self.payload[..size]))
    }

    /// Build a text message frame, appending the terminator byte.
    pub fn message(frame_type: FrameType, text: &str) -> Result<Self> {
        let mut payload = BytesMut::with_capacity(text.len() + 1);
        payload.put_slice(text.as_bytes());
        payload.put_u8(MESSAGE_TERMINATOR);
        Frame::new(frame_type, payload.freeze())
    }

    /// Text of a Message/MessageResponse frame without its terminator.
    ///
    /// Empty for any other frame type and for an empty payload.
    pub fn text(&self) -> Cow<'_, str> {
        if !self.frame_type.is_informational() {
            return Cow::Borrowed("");
        }
        match self.payload.split_last() {
            Some((_terminator, body)) => String::from_utf8_lossy(body),
            None => Cow::Borrowed(""),
        }
    }

    /// Payload cut down to at most `len` bytes.
    pub fn payload_prefix(&self, len: usize) -> Bytes {
        self.payload.slice(..len.min(self.payload.len()))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame{{type: {}, length: {}, data: ",
            self.frame_type, self.length
        )?;
        match self.frame_type {
            FrameType::DeviceInfoRequest | FrameType::DeviceInfoResponse => {
                match self.interpret::<DeviceInfo>() {
                    Some(info) => write!(f, "chip_id=0x{:08X}", info.chip_id)?,
                    None => f.write_str("...")?,
                }
            }
            FrameType::Message | FrameType::MessageResponse => f.write_str(&self.text())?,
            _ => f.write_str("...")?,
        }
        f.write_str("}")
    }
}
