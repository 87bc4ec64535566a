use std::io::Read;

use tracing::trace;

use crate::codec::{decode_frame, Frame};
use crate::error::Result;

/// Reads complete frames from any blocking `Read` stream.
///
/// No read-ahead: each call consumes exactly one frame's bytes, so the
/// underlying stream is left positioned at the next frame boundary.
pub struct FrameReader<T> {
    inner: T,
    frames_read: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Read the next complete frame (blocking).
    pub fn read_frame(&mut self) -> Result<Frame> {
        let frame = decode_frame(&mut self.inner)?;
        self.frames_read += 1;
        trace!(
            frame_type = %frame.frame_type,
            length = frame.length,
            "read frame"
        );
        Ok(frame)
    }

    /// Number of frames successfully decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
