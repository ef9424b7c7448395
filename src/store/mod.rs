//! Content-addressable blob store.
//!
//! # Data Flow
//! ```text
//! startup: snapshot file → persistence::load_snapshot (blocking) → BlobStore
//!
//! POST /api/store/
//!     → BlobStore::put (digest, insert/update under entry lock)
//!     → PersistenceQueue::flush (enqueue, returns immediately)
//!     → worker task: snapshot → <path>.tmp → rename over <path>
//! ```
//!
//! # Design Decisions
//! - Ids are URL-safe base64 MD5 digests; MD5 is for dedup, not security
//! - The in-memory map is authoritative; disk lags behind it
//! - One worker owns every write, so snapshot writes never interleave

pub mod blob;
pub mod memory;
pub mod persistence;

use thiserror::Error;

pub use blob::{digest_id, StoredBlob};
pub use memory::{BlobStore, PutOutcome};
pub use persistence::PersistenceQueue;

/// Errors raised by the blob store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
