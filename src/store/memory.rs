//! In-memory blob map with optional snapshot persistence.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::store::blob::{digest_id, now_millis, StoredBlob};
use crate::store::persistence::{load_snapshot, PersistenceQueue};
use crate::store::StoreError;

pub(crate) type BlobMap = DashMap<String, StoredBlob>;

/// Result of a successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub id: String,
    /// `true` when the id was not stored before.
    pub created: bool,
}

/// A thread-safe content-addressable store.
///
/// Cheap to clone; clones share the same map and writer.
#[derive(Clone)]
pub struct BlobStore {
    blobs: Arc<BlobMap>,
    max_body_bytes: usize,
    persistence: Option<PersistenceQueue>,
}

impl BlobStore {
    /// Create an empty store that never touches disk.
    pub fn in_memory(max_body_bytes: usize) -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
            max_body_bytes,
            persistence: None,
        }
    }

    /// Load the snapshot at `config.path` (blocking) and start the writer.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = PathBuf::from(&config.path);
        let loaded = load_snapshot(&path)?;

        let blobs: Arc<BlobMap> = Arc::new(loaded.into_iter().collect());
        metrics::record_store_size(blobs.len());

        let persistence = PersistenceQueue::spawn(path, blobs.clone());
        Ok(Self {
            blobs,
            max_body_bytes: config.max_body_bytes,
            persistence: Some(persistence),
        })
    }

    /// Store `body`, returning its id.
    ///
    /// Schedules a snapshot write but does not wait for it.
    pub fn put(&self, body: impl Into<Vec<u8>>) -> Result<PutOutcome, StoreError> {
        let body = body.into();
        if body.len() > self.max_body_bytes {
            metrics::record_store_put("rejected");
            return Err(StoreError::PayloadTooLarge {
                size: body.len(),
                limit: self.max_body_bytes,
            });
        }

        let id = digest_id(&body);
        let now = now_millis();
        let created = match self.blobs.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let blob = entry.get_mut();
                blob.body = body;
                // modified must move forward even within the same millisecond
                blob.modified = now.max(blob.modified + 1);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(StoredBlob {
                    id: id.clone(),
                    body,
                    created: now,
                    modified: now,
                });
                true
            }
        };

        metrics::record_store_put(if created { "created" } else { "updated" });
        metrics::record_store_size(self.blobs.len());
        tracing::debug!(id = %id, created, "Blob stored");

        if let Some(persistence) = &self.persistence {
            persistence.flush();
        }

        Ok(PutOutcome { id, created })
    }

    pub fn get(&self, id: &str) -> Option<StoredBlob> {
        self.blobs.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Wait for all scheduled snapshot writes. No-op for in-memory stores.
    pub async fn settle(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.settle().await;
        }
    }
}
