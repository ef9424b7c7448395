//! Serialized snapshot writes.
//!
//! All writes go through one Tokio task fed by an unbounded channel, so two
//! writes never overlap and they finish in the order they were requested.
//! A write snapshots the map when it starts; flush requests that queued up
//! while the previous write ran are folded into that single write, since
//! its snapshot already contains their state.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::observability::metrics;
use crate::store::blob::StoredBlob;
use crate::store::memory::BlobMap;
use crate::store::StoreError;

enum Command {
    Flush,
    /// Reply once every request queued ahead of this one is on disk.
    Settle(oneshot::Sender<()>),
}

/// Handle to the snapshot writer task.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl PersistenceQueue {
    /// Spawn the writer task. Must be called inside a Tokio runtime.
    pub(crate) fn spawn(path: PathBuf, blobs: Arc<BlobMap>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path, blobs, rx));
        Self { tx }
    }

    /// Schedule a snapshot write without waiting for it.
    pub fn flush(&self) {
        if self.tx.send(Command::Flush).is_err() {
            tracing::error!("Snapshot writer is gone; flush dropped");
        }
    }

    /// Wait until every flush scheduled before this call has been written
    /// (successfully or not).
    pub async fn settle(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Settle(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(path: PathBuf, blobs: Arc<BlobMap>, mut rx: mpsc::UnboundedReceiver<Command>) {
    tracing::debug!(path = %path.display(), "Snapshot writer started");

    while let Some(command) = rx.recv().await {
        let mut write_pending = false;
        let mut waiters = Vec::new();

        let mut next = Some(command);
        while let Some(command) = next {
            match command {
                Command::Flush => write_pending = true,
                Command::Settle(done) => waiters.push(done),
            }
            next = rx.try_recv().ok();
        }

        if write_pending {
            let snapshot = snapshot_of(&blobs);
            let start = Instant::now();
            match write_snapshot(&path, &snapshot).await {
                Ok(()) => {
                    metrics::record_flush(true, start.elapsed());
                    tracing::debug!(
                        path = %path.display(),
                        blobs = snapshot.len(),
                        "Snapshot written"
                    );
                }
                Err(e) => {
                    metrics::record_flush(false, start.elapsed());
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Snapshot write failed; in-memory store remains authoritative"
                    );
                }
            }
        }

        for done in waiters {
            let _ = done.send(());
        }
    }

    tracing::debug!(path = %path.display(), "Snapshot writer stopped");
}

pub(crate) fn snapshot_of(blobs: &BlobMap) -> BTreeMap<String, StoredBlob> {
    blobs
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

/// Write `snapshot` to `path` via a sibling temp file and an atomic rename.
pub async fn write_snapshot(
    path: &Path,
    snapshot: &BTreeMap<String, StoredBlob>,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec(snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &encoded).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read the snapshot at `path`, blocking.
///
/// A missing file is initialized empty (creating parent directories).
pub fn load_snapshot(path: &Path) -> Result<HashMap<String, StoredBlob>, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match File::open(path) {
        Ok(file) => {
            let blobs: HashMap<String, StoredBlob> =
                serde_json::from_reader(BufReader::new(file))?;
            tracing::info!(path = %path.display(), blobs = blobs.len(), "Loaded store snapshot");
            Ok(blobs)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            std::fs::write(path, b"{}")?;
            tracing::info!(path = %path.display(), "No snapshot found; initialized empty store");
            Ok(HashMap::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
