//! Atomic snapshots of the full store.
//!
//! A snapshot is serialized to a temporary file, fsynced, then renamed over
//! the canonical path. The canonical file is therefore always a complete
//! snapshot (the previous one or the new one), even if the process dies
//! mid-write. The journal is cleared only after the rename succeeds; on any
//! failure the stale snapshot plus the intact journal still reconstruct the
//! state.

use crate::error::{Result, StoreError};
use crate::journal::Journal;
use crate::store::UrlStore;
use crate::types::StoreState;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Serialize `state` to `path` via write-to-temp plus atomic rename.
pub fn write_snapshot(state: &StoreState, path: &Path) -> Result<()> {
    let data = serde_json::to_vec_pretty(state)?;

    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(&data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a snapshot from `path`.
///
/// Strict: missing or unparseable files are errors here. Recovery decides
/// how tolerant to be.
pub fn read_snapshot(path: &Path) -> Result<StoreState> {
    let data = fs::read(path)?;
    let state = serde_json::from_slice(&data)
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    Ok(state)
}

/// Snapshot the store and, only if that fully succeeds, clear the journal.
pub fn checkpoint(store: &UrlStore, journal: &Journal, path: &Path) -> Result<()> {
    let state = store.snapshot();
    write_snapshot(&state, path)?;
    journal.clear()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Background task that periodically checkpoints the store.
///
/// Runs on a fixed interval, independent of request traffic. A failed cycle
/// is logged and retried on the next tick; the on-disk state stays
/// recoverable throughout.
pub struct SnapshotManager {
    shutdown: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SnapshotManager {
    /// Start the snapshot loop.
    pub fn start(
        store: Arc<UrlStore>,
        journal: Arc<Journal>,
        path: impl Into<PathBuf>,
        interval: Duration,
    ) -> Result<Self> {
        let path = path.into();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let worker = thread::Builder::new()
            .name("snapshot-manager".into())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            match checkpoint(&store, &journal, &path) {
                                Ok(()) => {
                                    tracing::debug!(path = %path.display(), "snapshot written")
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "snapshot cycle failed")
                                }
                            }
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    /// Stop the loop and wait for the worker to exit.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the select.
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SnapshotManager {
    fn drop(&mut self) {
        self.stop();
    }
}
