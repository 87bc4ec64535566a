use std::fmt;
use std::io;

use fwdump_frame::FrameError;
use fwdump_session::SessionError;
use fwdump_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::UnsupportedBaudRate(_) => CliError::usage(format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::HandshakeFailed(_)
        | SessionError::UnexpectedType { .. }
        | SessionError::ShortPayload { .. }
        | SessionError::MalformedPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::EmptyRead
        | SessionError::AddressOverflow { .. }
        | SessionError::InvalidChunkSize(_) => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use fwdump_frame::FrameType;

    use super::*;

    #[test]
    fn protocol_violations_are_data_invalid() {
        let err = session_error(
            "dump failed",
            SessionError::ShortPayload {
                address: 0x1000,
                requested: 16,
                received: 4,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("dump failed: short memory response"));

        let err = session_error(
            "info failed",
            SessionError::Frame(FrameError::BadMagic {
                seen: [0, 1, 2, 3],
            }),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = session_error(
            "info failed",
            SessionError::UnexpectedType {
                expected: FrameType::DeviceInfoResponse,
                actual: FrameType::MemoryReadResponse,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn timeouts_and_closures() {
        assert_eq!(frame_error("x", FrameError::Timeout).code, TIMEOUT);
        assert_eq!(frame_error("x", FrameError::ConnectionClosed).code, FAILURE);
        assert_eq!(
            io_error("x", io::Error::new(io::ErrorKind::TimedOut, "slow")).code,
            TIMEOUT
        );
    }

    #[test]
    fn transport_failures() {
        let missing = TransportError::Open {
            path: "/dev/ttyUSB9".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(transport_error("x", missing).code, TRANSPORT_ERROR);

        let denied = TransportError::Open {
            path: "/dev/ttyUSB0".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(transport_error("x", denied).code, PERMISSION_DENIED);

        assert_eq!(
            transport_error("x", TransportError::UnsupportedBaudRate(7)).code,
            USAGE
        );
    }

    #[test]
    fn argument_errors_are_usage() {
        assert_eq!(session_error("x", SessionError::EmptyRead).code, USAGE);
        assert_eq!(
            session_error("x", SessionError::InvalidChunkSize(0)).code,
            USAGE
        );
    }
}
