//! Dump memory from microcontroller firmware over a framed serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port with read timeout and RTS reset control
//! - [`frame`]: wire frames, typed payload views, frame reader/writer
//! - [`session`]: handshake, request/response exchange and chunked memory
//!   reads (behind the `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use fwdump_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fwdump_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use fwdump_session::*;
}
