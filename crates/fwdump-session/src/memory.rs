//! Chunked reads of device memory.
//!
//! A region is split into consecutive requests of at most `chunk_size`
//! bytes. Responses longer than requested are cut down; shorter ones are
//! fatal. The result is exactly the requested number of bytes.

use std::io::{Read, Write};

use fwdump_frame::{FixedLayout, FrameType, MemoryReadRequest};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Default bytes per MemoryReadRequest.
pub const DEFAULT_CHUNK_SIZE: u32 = 4096;

/// One request in a chunked read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the plan.
    pub index: u32,
    pub address: u32,
    pub length: u32,
}

/// The sequence of chunks covering a region, in ascending address order.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    start: u32,
    total: u32,
    chunk_size: u32,
    count: u32,
    next: u32,
}

impl ChunkPlan {
    /// Number of chunks in the whole plan.
    pub fn total_chunks(&self) -> u32 {
        self.count
    }

    /// Total bytes covered.
    pub fn total_bytes(&self) -> u32 {
        self.total
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let offset = index * self.chunk_size;
        let length = if index + 1 == self.count {
            // Last chunk: the remainder, or a full chunk when the total divides evenly.
            match self.total % self.chunk_size {
                0 => self.chunk_size,
                rem => rem,
            }
        } else {
            self.chunk_size
        };

        Some(Chunk {
            index,
            address: self.start + offset,
            length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}

/// Split `total` bytes starting at `start` into requests of `chunk_size`.
///
/// Rejects a zero total, a chunk size outside 1..=65535, and regions whose
/// last byte would lie past `u32::MAX`.
pub fn plan_chunks(start: u32, total: u32, chunk_size: u32) -> Result<ChunkPlan> {
    if total == 0 {
        return Err(SessionError::EmptyRead);
    }
    if chunk_size == 0 || chunk_size > u32::from(u16::MAX) {
        return Err(SessionError::InvalidChunkSize(chunk_size));
    }
    if start.checked_add(total - 1).is_none() {
        return Err(SessionError::AddressOverflow {
            start,
            length: total,
        });
    }

    Ok(ChunkPlan {
        start,
        total,
        chunk_size,
        count: total.div_ceil(chunk_size),
        next: 0,
    })
}

/// Progress after a chunk has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub index: u32,
    pub total_chunks: u32,
    pub address: u32,
    pub length: u32,
    pub bytes_done: u32,
    pub total_bytes: u32,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Read `length` bytes of device memory starting at `start`.
    pub fn read_memory(&mut self, start: u32, length: u32) -> Result<Vec<u8>> {
        self.read_memory_with_progress(start, length, |_| {})
    }

    /// Read memory, calling `progress` after each chunk arrives.
    ///
    /// Invalid arguments are rejected before anything is sent and leave the
    /// session usable. Once the first request is out, any failure is fatal.
    pub fn read_memory_with_progress<F>(
        &mut self,
        start: u32,
        length: u32,
        mut progress: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(&ChunkProgress),
    {
        let plan = plan_chunks(start, length, self.config().chunk_size)?;
        let total_chunks = plan.total_chunks();
        info!(
            address = %format!("0x{start:08X}"),
            length,
            chunks = total_chunks,
            "reading memory"
        );

        let mut image: Vec<u8> = Vec::with_capacity(length as usize);
        for chunk in plan {
            let request = MemoryReadRequest {
                address: chunk.address,
                length: chunk.length,
            }
            .to_frame();
            let response = self.exchange_expecting(&request, FrameType::MemoryReadResponse)?;

            if response.payload.len() < chunk.length as usize {
                return self.fail(SessionError::ShortPayload {
                    address: chunk.address,
                    requested: chunk.length,
                    received: response.payload.len(),
                });
            }
            if response.payload.len() > chunk.length as usize {
                debug!(
                    address = %format!("0x{:08X}", chunk.address),
                    extra = response.payload.len() - chunk.length as usize,
                    "dropping excess response bytes"
                );
            }
            image.extend_from_slice(&response.payload_prefix(chunk.length as usize));

            progress(&ChunkProgress {
                index: chunk.index,
                total_chunks,
                address: chunk.address,
                length: chunk.length,
                bytes_done: image.len() as u32,
                total_bytes: length,
            });
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use fwdump_frame::{decode_frame, Frame};

    use super::*;
    use crate::session::{SessionConfig, SessionState};

    fn lengths(plan: ChunkPlan) -> Vec<u32> {
        plan.map(|chunk| chunk.length).collect()
    }

    #[test]
    fn plan_with_remainder() {
        let plan = plan_chunks(0x1000, 10_000, 4096).unwrap();
        assert_eq!(plan.len(), 3);
        let chunks: Vec<_> = plan.collect();
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    index: 0,
                    address: 0x1000,
                    length: 4096
                },
                Chunk {
                    index: 1,
                    address: 0x2000,
                    length: 4096
                },
                Chunk {
                    index: 2,
                    address: 0x3000,
                    length: 1808
                },
            ]
        );
    }

    #[test]
    fn plan_exact_multiple_ends_with_full_chunk() {
        assert_eq!(lengths(plan_chunks(0, 8192, 4096).unwrap()), vec![4096, 4096]);
        assert_eq!(lengths(plan_chunks(0, 4096, 4096).unwrap()), vec![4096]);
    }

    #[test]
    fn plan_smaller_than_one_chunk() {
        assert_eq!(lengths(plan_chunks(0, 1, 4096).unwrap()), vec![1]);
        assert_eq!(lengths(plan_chunks(0, 5000, 65535).unwrap()), vec![5000]);
    }

    #[test]
    fn plan_rejections() {
        assert!(matches!(plan_chunks(0, 0, 4096), Err(SessionError::EmptyRead)));
        assert!(matches!(
            plan_chunks(0, 10, 0),
            Err(SessionError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            plan_chunks(0, 10, 65_536),
            Err(SessionError::InvalidChunkSize(65_536))
        ));
        assert!(matches!(
            plan_chunks(0xFFFF_FF00, 0x200, 4096),
            Err(SessionError::AddressOverflow {
                start: 0xFFFF_FF00,
                length: 0x200
            })
        ));
    }

    #[test]
    fn plan_reaching_top_of_address_space() {
        let chunks: Vec<_> = plan_chunks(0xFFFF_FF00, 0x100, 0x80).unwrap().collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].address, 0xFFFF_FF80);
        assert_eq!(chunks[1].length, 0x80);
    }

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            frame.encode(&mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn mem(bytes: Vec<u8>) -> Frame {
        Frame::new(FrameType::MemoryReadResponse, bytes).unwrap()
    }

    fn session_with(
        replies: &[Frame],
        chunk_size: u32,
    ) -> Session<Cursor<Vec<u8>>, Cursor<Vec<u8>>> {
        let mut frames = vec![Frame::message(FrameType::MessageResponse, "ready").unwrap()];
        frames.extend_from_slice(replies);
        let mut session = Session::with_config(
            Cursor::new(wire(&frames)),
            Cursor::new(Vec::new()),
            SessionConfig { chunk_size },
        );
        session.handshake().unwrap();
        session
    }

    fn requests(session: Session<Cursor<Vec<u8>>, Cursor<Vec<u8>>>) -> Vec<MemoryReadRequest> {
        let (_, writer) = session.into_parts();
        let bytes = writer.into_inner();
        let len = bytes.len() as u64;
        let mut cursor = Cursor::new(bytes);
        let mut out = Vec::new();
        while cursor.position() < len {
            let frame = decode_frame(&mut cursor).unwrap();
            assert_eq!(frame.frame_type, FrameType::MemoryReadRequest);
            out.push(frame.interpret::<MemoryReadRequest>().unwrap());
        }
        out
    }

    #[test]
    fn reads_in_chunks_and_concatenates() {
        let first: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
        let second: Vec<u8> = vec![0xAB; 904];
        let mut session = session_with(&[mem(first.clone()), mem(second.clone())], 4096);

        let image = session.read_memory(0x0800_0000, 5000).unwrap();
        assert_eq!(image.len(), 5000);
        // Built in place: no spare or regrown buffer behind the result.
        assert_eq!(image.capacity(), 5000);
        assert_eq!(&image[..4096], first.as_slice());
        assert_eq!(&image[4096..], second.as_slice());
        assert_eq!(session.state(), SessionState::Ready);

        assert_eq!(
            requests(session),
            vec![
                MemoryReadRequest {
                    address: 0x0800_0000,
                    length: 4096
                },
                MemoryReadRequest {
                    address: 0x0800_1000,
                    length: 904
                },
            ]
        );
    }

    #[test]
    fn excess_response_bytes_are_dropped() {
        let mut padded = vec![0x11; 16];
        padded.extend_from_slice(&[0xEE; 8]);
        let mut session = session_with(&[mem(padded)], 4096);

        let image = session.read_memory(0, 16).unwrap();
        assert_eq!(image, vec![0x11; 16]);
    }

    #[test]
    fn short_response_is_fatal() {
        let mut session = session_with(&[mem(vec![0u8; 100])], 4096);

        let err = session.read_memory(0x2000_0000, 128).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ShortPayload {
                address: 0x2000_0000,
                requested: 128,
                received: 100
            }
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn informational_frames_between_chunks_are_skipped() {
        let mut session = session_with(
            &[
                mem(vec![1; 4]),
                Frame::message(FrameType::Message, "flash busy").unwrap(),
                mem(vec![2; 4]),
            ],
            4,
        );

        let image = session.read_memory(0, 8).unwrap();
        assert_eq!(image, vec![1, 1, 1, 1, 2, 2, 2, 2]);
        assert_eq!(session.notices().len(), 1);
        assert_eq!(session.notices()[0].text, "flash busy");
    }

    #[test]
    fn progress_reported_per_chunk() {
        let mut session = session_with(&[mem(vec![0; 4]), mem(vec![0; 4]), mem(vec![0; 2])], 4);

        let mut seen = Vec::new();
        session
            .read_memory_with_progress(0x100, 10, |p| seen.push(*p))
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen[2],
            ChunkProgress {
                index: 2,
                total_chunks: 3,
                address: 0x108,
                length: 2,
                bytes_done: 10,
                total_bytes: 10,
            }
        );
        assert_eq!(
            seen.iter().map(|p| p.bytes_done).collect::<Vec<_>>(),
            vec![4, 8, 10]
        );
    }

    #[test]
    fn bad_arguments_send_nothing_and_keep_session_usable() {
        let mut session = session_with(&[mem(vec![7; 4])], 4);

        assert!(matches!(
            session.read_memory(0, 0),
            Err(SessionError::EmptyRead)
        ));
        assert!(matches!(
            session.read_memory(u32::MAX, 2),
            Err(SessionError::AddressOverflow { .. })
        ));
        assert_eq!(session.state(), SessionState::Ready);

        assert_eq!(session.read_memory(0, 4).unwrap(), vec![7; 4]);
        assert_eq!(requests(session).len(), 1);
    }

    #[test]
    fn invalid_configured_chunk_size_is_rejected() {
        let mut session = session_with(&[], 0);
        assert!(matches!(
            session.read_memory(0, 16),
            Err(SessionError::InvalidChunkSize(0))
        ));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn wrong_reply_type_is_fatal() {
        let mut session = session_with(
            &[Frame::new(FrameType::DeviceInfoResponse, vec![0, 0, 0, 1]).unwrap()],
            4096,
        );
        let err = session.read_memory(0, 4).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnexpectedType {
                expected: FrameType::MemoryReadResponse,
                actual: FrameType::DeviceInfoResponse
            }
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }
}
