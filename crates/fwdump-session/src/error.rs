use fwdump_frame::FrameType;

use crate::session::SessionState;

/// Errors that can occur in session operations.
///
/// Every variant raised after I/O has started leaves the session in
/// [`SessionState::Failed`]; the protocol has no way to resynchronize.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] fwdump_transport::TransportError),

    /// Frame-level error (bad magic, truncation, invalid length, timeout).
    #[error("frame error: {0}")]
    Frame(#[from] fwdump_frame::FrameError),

    /// The first frame after reset was not a valid MessageResponse.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// A reply arrived with a different type than the request calls for.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedType {
        expected: FrameType,
        actual: FrameType,
    },

    /// A memory chunk came back shorter than requested.
    #[error("short memory response at 0x{address:08X}: requested {requested} bytes, got {received}")]
    ShortPayload {
        address: u32,
        requested: u32,
        received: usize,
    },

    /// A reply payload was too short for its fixed layout.
    #[error("malformed {frame_type} payload: need {needed} bytes, got {received}")]
    MalformedPayload {
        frame_type: FrameType,
        needed: usize,
        received: usize,
    },

    /// A memory read of zero bytes was requested.
    #[error("memory read length must be greater than zero")]
    EmptyRead,

    /// The requested region runs past the end of the 32-bit address space.
    #[error("region 0x{start:08X} + {length} bytes exceeds the 32-bit address space")]
    AddressOverflow { start: u32, length: u32 },

    /// Chunk size outside 1..=65535.
    #[error("chunk size {0} out of range (1..=65535)")]
    InvalidChunkSize(u32),

    /// The session cannot accept this operation in its current state.
    #[error("session not usable in state {state}")]
    Unusable { state: SessionState },
}

pub type Result<T> = std::result::Result<T, SessionError>;
