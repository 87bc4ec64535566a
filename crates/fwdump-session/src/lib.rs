//! Request/response sessions with a device.
//!
//! This is the layer callers use: reset the device, wait for its ready
//! banner, then exchange requests for replies. Informational messages the
//! device interleaves are collected as [`Notice`]s and never returned as a
//! reply. Memory regions of any size are read in fixed-size chunks.

pub mod connector;
pub mod error;
pub mod handshake;
pub mod memory;
pub mod session;

#[cfg(unix)]
pub use connector::{connect, connect_with_config};
pub use connector::{establish, ConnectConfig};
pub use error::{Result, SessionError};
pub use handshake::{await_banner, HandshakeResult};
pub use memory::{plan_chunks, Chunk, ChunkPlan, ChunkProgress, DEFAULT_CHUNK_SIZE};
pub use session::{Notice, Session, SessionConfig, SessionState, MAX_QUEUED_NOTICES};
