//! Serial byte-stream transport for talking to an embedded device.
//!
//! This is the lowest layer of fwdump. It provides:
//! - [`SerialPort`]: a raw-mode tty with blocking reads bounded by a timeout
//! - [`ControlLines`]: out-of-band reset signaling and queue flushing
//!
//! Everything above it only needs `Read + Write`.

pub mod control;
pub mod error;

#[cfg(unix)]
pub mod serial;

pub use control::{reset_device, ControlLines, ResetConfig};
pub use error::{Result, TransportError};

#[cfg(unix)]
pub use serial::SerialPort;
