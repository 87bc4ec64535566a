use std::io::Read;

use fwdump_frame::{FrameReader, FrameType};
use tracing::info;

use crate::error::{Result, SessionError};

/// Outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Text of the device's ready banner.
    pub banner: String,
}

/// Wait for the ready banner the device sends after reset.
///
/// Performs exactly one blocking frame read. Anything other than a valid
/// MessageResponse fails the handshake; there is no retry.
pub fn await_banner<R: Read>(reader: &mut FrameReader<R>) -> Result<HandshakeResult> {
    let frame = reader.read_frame()?;

    if !frame.validate() {
        return Err(SessionError::HandshakeFailed(format!(
            "invalid banner frame: length field {} but payload has {} bytes",
            frame.length,
            frame.payload.len()
        )));
    }
    if frame.frame_type != FrameType::MessageResponse {
        return Err(SessionError::HandshakeFailed(format!(
            "expected {} banner, got {frame}",
            FrameType::MessageResponse
        )));
    }

    let banner = frame.text().into_owned();
    info!(%banner, "device ready");
    Ok(HandshakeResult { banner })
}
