pub mod chunker;
pub mod codec;
pub mod job;
pub mod layout;
pub mod manifest;
pub mod progress;
pub mod source;

/// Bytes per megabyte as used for `chunkSizeMB`.
pub const MIB: u64 = 1024 * 1024;

pub use chunker::{ChunkOutcome, Chunker, ChunkerConfig, SkipReason};
pub use codec::ChunkFormat;
pub use job::ChunkJob;
pub use manifest::Manifest;
