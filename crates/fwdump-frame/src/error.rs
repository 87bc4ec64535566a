use crate::codec::FrameType;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream did not start with the frame magic. Carries the bytes seen.
    #[error("bad frame magic {seen:02X?} (expected DE AD BE EF)")]
    BadMagic { seen: [u8; 4] },

    /// The stream ended or timed out part way through a frame.
    #[error("truncated frame: {field} needs {expected} bytes, got {received}")]
    Truncated {
        field: &'static str,
        expected: usize,
        received: usize,
    },

    /// The length field disagrees with the number of payload bytes.
    #[error("invalid {frame_type} frame: length field says {declared}, payload has {actual}")]
    InvalidFrame {
        frame_type: FrameType,
        declared: u16,
        actual: usize,
    },

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No frame started within the stream's read timeout.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// The stream ended cleanly between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
