use std::fmt;
use std::io::{Read, Write};

use fwdump_frame::{DeviceInfo, FixedLayout, Frame, FrameError, FrameReader, FrameType, FrameWriter};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::handshake::{await_banner, HandshakeResult};
use crate::memory::DEFAULT_CHUNK_SIZE;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the device's ready banner.
    AwaitingHandshake,
    /// Idle; a request may be sent.
    Ready,
    /// A request is in flight.
    AwaitingResponse,
    /// A protocol or I/O error occurred. Terminal.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingHandshake => "awaiting-handshake",
            Self::Ready => "ready",
            Self::AwaitingResponse => "awaiting-response",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An informational message the device sent while a reply was pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub frame_type: FrameType,
    pub text: String,
}

/// Notices kept before the oldest are discarded. Each one is also logged.
pub const MAX_QUEUED_NOTICES: usize = 256;

/// Session behavior knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bytes requested per MemoryReadRequest. Default: 4096.
    pub chunk_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A strictly sequential request/response conversation with one device.
///
/// At most one request is in flight. Any error after I/O has started moves
/// the session to [`SessionState::Failed`]; recovery means reconnecting.
pub struct Session<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    config: SessionConfig,
    state: SessionState,
    handshake: Option<HandshakeResult>,
    notices: Vec<Notice>,
    notices_dropped: u64,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Create a session over separate read and write halves of one link.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(reader: R, writer: W, config: SessionConfig) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
            config,
            state: SessionState::AwaitingHandshake,
            handshake: None,
            notices: Vec::new(),
            notices_dropped: 0,
        }
    }

    /// Wait for the ready banner. Must succeed before any request.
    pub fn handshake(&mut self) -> Result<&HandshakeResult> {
        self.require(SessionState::AwaitingHandshake)?;
        let result = await_banner(&mut self.reader);
        let result = self.settle(result)?;
        self.state = SessionState::Ready;
        Ok(&*self.handshake.insert(result))
    }

    /// Send one request and return the first non-informational reply.
    ///
    /// Message/MessageResponse frames received while waiting are queued as
    /// [`Notice`]s and skipped.
    ///
    /// A request failing [`Frame::validate`] is refused before anything is
    /// written and leaves the session usable.
    pub fn exchange(&mut self, request: &Frame) -> Result<Frame> {
        self.require(SessionState::Ready)?;
        if !request.validate() {
            return Err(SessionError::Frame(FrameError::InvalidFrame {
                frame_type: request.frame_type,
                declared: request.length,
                actual: request.payload.len(),
            }));
        }
        self.state = SessionState::AwaitingResponse;
        let result = self.exchange_inner(request);
        let response = self.settle(result)?;
        self.state = SessionState::Ready;
        Ok(response)
    }

    /// Like [`exchange`](Self::exchange), but the reply must be of type `expected`.
    pub fn exchange_expecting(&mut self, request: &Frame, expected: FrameType) -> Result<Frame> {
        let response = self.exchange(request)?;
        if response.frame_type != expected {
            return self.fail(SessionError::UnexpectedType {
                expected,
                actual: response.frame_type,
            });
        }
        Ok(response)
    }

    /// Ask the device for its identity.
    pub fn request_device_info(&mut self) -> Result<DeviceInfo> {
        let response = self.exchange_expecting(
            &Frame::empty(FrameType::DeviceInfoRequest),
            FrameType::DeviceInfoResponse,
        )?;
        match response.interpret::<DeviceInfo>() {
            Some(info) => {
                info!(chip_id = %format!("0x{:08X}", info.chip_id), "device info");
                Ok(info)
            }
            None => self.fail(SessionError::MalformedPayload {
                frame_type: response.frame_type,
                needed: DeviceInfo::ENCODED_SIZE,
                received: response.payload.len(),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Banner captured by a successful handshake.
    pub fn handshake_result(&self) -> Option<&HandshakeResult> {
        self.handshake.as_ref()
    }

    /// Notices received so far and not yet taken.
    ///
    /// At most [`MAX_QUEUED_NOTICES`] are kept; once full, the oldest is
    /// discarded for each new one.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Notices discarded because the queue was full.
    pub fn notices_dropped(&self) -> u64 {
        self.notices_dropped
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Consume the session and return the read and write halves.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    /// Mark the session failed and return `err`.
    pub(crate) fn fail<T>(&mut self, err: SessionError) -> Result<T> {
        warn!(error = %err, "session failed");
        self.state = SessionState::Failed;
        Err(err)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => self.fail(err),
        }
    }

    fn queue_notice(&mut self, notice: Notice) {
        if self.notices.len() >= MAX_QUEUED_NOTICES {
            self.notices.remove(0);
            self.notices_dropped += 1;
        }
        self.notices.push(notice);
    }

    fn require(&self, state: SessionState) -> Result<()> {
        if self.state != state {
            return Err(SessionError::Unusable { state: self.state });
        }
        Ok(())
    }

    fn exchange_inner(&mut self, request: &Frame) -> Result<Frame> {
        debug!(request = %request, "sending request");
        self.writer.write_frame(request)?;

        loop {
            let frame = self.reader.read_frame()?;
            if !frame.validate() {
                return Err(SessionError::Frame(FrameError::InvalidFrame {
                    frame_type: frame.frame_type,
                    declared: frame.length,
                    actual: frame.payload.len(),
                }));
            }

            if frame.frame_type.is_informational() {
                let notice = Notice {
                    frame_type: frame.frame_type,
                    text: frame.text().into_owned(),
                };
                info!(text = %notice.text, "device message");
                self.queue_notice(notice);
                continue;
            }

            debug!(response = %frame, "received response");
            return Ok(frame);
        }
    }
}
