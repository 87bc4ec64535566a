use std::fmt;
use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (4) + type (1) + length (2) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: `DE AD BE EF`.
pub const MAGIC: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// The one-byte tag selecting how a payload is interpreted.
///
/// Host requests have the high bit clear; device responses have it set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Host asks for the device identity. Empty payload.
    DeviceInfoRequest,
    /// Host asks for a memory region. Payload is a [`MemoryReadRequest`](crate::MemoryReadRequest).
    MemoryReadRequest,
    /// Text notice sent by the host.
    Message,
    /// Device identity. Payload is a [`DeviceInfo`](crate::DeviceInfo).
    DeviceInfoResponse,
    /// Raw memory bytes.
    MemoryReadResponse,
    /// Text notice sent by the device.
    MessageResponse,
    /// Any tag this host does not know.
    Unknown(u8),
}

impl FrameType {
    /// Bit set on every device-to-host frame type.
    pub const RESPONSE_BIT: u8 = 0x80;

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::DeviceInfoRequest,
            0x02 => Self::MemoryReadRequest,
            0x03 => Self::Message,
            0x81 => Self::DeviceInfoResponse,
            0x82 => Self::MemoryReadResponse,
            0x83 => Self::MessageResponse,
            other => Self::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::DeviceInfoRequest => 0x01,
            Self::MemoryReadRequest => 0x02,
            Self::Message => 0x03,
            Self::DeviceInfoResponse => 0x81,
            Self::MemoryReadResponse => 0x82,
            Self::MessageResponse => 0x83,
            Self::Unknown(byte) => byte,
        }
    }

    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::DeviceInfoRequest => "DeviceInfoRequest",
            Self::MemoryReadRequest => "MemoryReadRequest",
            Self::Message => "Message",
            Self::DeviceInfoResponse => "DeviceInfoResponse",
            Self::MemoryReadResponse => "MemoryReadResponse",
            Self::MessageResponse => "MessageResponse",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// True for device-to-host frame types.
    pub fn is_response(self) -> bool {
        self.as_byte() & Self::RESPONSE_BIT != 0
    }

    /// True for text notices, which may arrive interleaved with any reply.
    pub fn is_informational(self) -> bool {
        matches!(self, Self::Message | Self::MessageResponse)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(byte) => write!(f, "Unknown(0x{byte:02X})"),
            known => f.write_str(known.name()),
        }
    }
}

/// A single protocol message.
///
/// Frames produced by [`decode_frame`] or [`Frame::new`] always satisfy
/// [`Frame::validate`]. [`Frame::from_parts`] can build frames that do not;
/// those are refused by the writer and by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// How the payload is to be interpreted.
    pub frame_type: FrameType,
    /// Declared payload length, as carried in the header.
    pub length: u16,
    /// The payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, rejecting payloads the length field cannot describe.
    pub fn new(frame_type: FrameType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let length = checked_length(payload.len())?;
        Ok(Self {
            frame_type,
            length,
            payload,
        })
    }

    /// Create a frame with no payload.
    pub fn empty(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            length: 0,
            payload: Bytes::new(),
        }
    }

    /// Assemble a frame from raw fields without checking them.
    pub fn from_parts(frame_type: FrameType, length: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            length,
            payload: payload.into(),
        }
    }

    /// True iff the declared length matches the payload.
    pub fn validate(&self) -> bool {
        usize::from(self.length) == self.payload.len()
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Append the wire image of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if !self.validate() {
            return Err(FrameError::InvalidFrame {
                frame_type: self.frame_type,
                declared: self.length,
                actual: self.payload.len(),
            });
        }
        encode_frame(self.frame_type, &self.payload, dst)
    }

    /// The wire image of this frame.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

fn checked_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: MAX_PAYLOAD,
    })
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────┬──────────┬─────────────────┐
/// │ Magic (4B)   │ Type │ Length   │ Payload         │
/// │ DE AD BE EF  │ (1B) │ (2B LE)  │ (Length bytes)  │
/// └──────────────┴──────┴──────────┴─────────────────┘
/// ```
pub fn encode_frame(frame_type: FrameType, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = checked_length(payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(frame_type.as_byte());
    dst.put_u16_le(length);
    dst.put_slice(payload);
    Ok(())
}

/// Read exactly one frame from a blocking stream.
///
/// Consumes `HEADER_SIZE + length` bytes on success. On failure whatever was
/// already read stays consumed; the stream is never rewound or scanned for
/// the next magic.
pub fn decode_frame<R: Read + ?Sized>(src: &mut R) -> Result<Frame> {
    let mut magic = [0u8; 4];
    read_field(src, &mut magic, "magic", true)?;
    if magic != MAGIC {
        return Err(FrameError::BadMagic { seen: magic });
    }

    let mut header = [0u8; 3];
    read_field(src, &mut header, "header", false)?;
    let frame_type = FrameType::from_byte(header[0]);
    let length = u16::from_le_bytes([header[1], header[2]]);

    let mut payload = vec![0u8; usize::from(length)];
    read_field(src, &mut payload, "payload", false)?;

    Ok(Frame {
        frame_type,
        length,
        payload: Bytes::from(payload),
    })
}

fn read_field<R: Read + ?Sized>(
    src: &mut R,
    buf: &mut [u8],
    field: &'static str,
    frame_start: bool,
) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) if frame_start && filled == 0 => return Err(FrameError::ConnectionClosed),
            Ok(0) => {
                return Err(FrameError::Truncated {
                    field,
                    expected: buf.len(),
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => {
                if frame_start && filled == 0 {
                    return Err(FrameError::Timeout);
                }
                return Err(FrameError::Truncated {
                    field,
                    expected: buf.len(),
                    received: filled,
                });
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}
