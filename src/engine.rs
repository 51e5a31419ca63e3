//! The engine the transport layer drives.
//!
//! `LinkEngine` ties the store, journal, and snapshot loop together behind
//! the three operations the routing layer needs: mint a key, resolve a key,
//! list mappings. It is constructed once at startup, after recovery has
//! rebuilt the state and before any request is served, and shared by
//! reference from then on.

use crate::codec;
use crate::error::{Result, StoreError};
use crate::journal::{self, Journal};
use crate::recovery;
use crate::snapshot::{self, SnapshotManager};
use crate::store::UrlStore;
use crate::types::{LogEntry, StoreStats, UrlRecord};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Snapshot file name inside the store directory.
const SNAPSHOT_FILE: &str = "urls.json";

/// Journal file name inside the store directory.
const JOURNAL_FILE: &str = "transaction.log";

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Directory holding the snapshot, journal, and lock files.
    pub path: PathBuf,

    /// How often the background snapshot cycle runs.
    pub snapshot_interval: Duration,

    /// Capacity of the journal writer queue.
    pub journal_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./links"),
            snapshot_interval: Duration::from_secs(10),
            journal_queue_capacity: journal::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The persistence and identifier-generation engine.
pub struct LinkEngine {
    config: EngineConfig,

    store: Arc<UrlStore>,
    journal: Arc<Journal>,
    snapshots: SnapshotManager,

    /// Lock file for exclusive access to the store directory. Declared last
    /// so the lock outlives the journal drain on drop.
    _lock_file: File,
}

impl LinkEngine {
    /// Open the engine: lock the directory, recover state from snapshot plus
    /// journal, and start the background workers.
    pub fn open(config: EngineConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        let snapshot_path = config.path.join(SNAPSHOT_FILE);
        let journal_path = config.path.join(JOURNAL_FILE);

        let (state, report) = recovery::recover(&snapshot_path, &journal_path);
        tracing::info!(
            urls = state.urls.len(),
            current_id = state.current_id,
            replayed = report.replayed,
            "link engine ready"
        );

        let store = Arc::new(UrlStore::from_state(state));
        let journal = Arc::new(Journal::with_capacity(
            &journal_path,
            config.journal_queue_capacity,
        )?);
        let snapshots = SnapshotManager::start(
            Arc::clone(&store),
            Arc::clone(&journal),
            snapshot_path,
            config.snapshot_interval,
        )?;

        Ok(Self {
            config,
            store,
            journal,
            snapshots,
            _lock_file: lock_file,
        })
    }

    /// Mint a short key for an already-validated URL.
    ///
    /// The counter, the derived key, and the stored record are committed in
    /// memory before the journal entry is queued; key uniqueness comes from
    /// the counter, so no collision check is needed.
    pub fn shorten(&self, original_url: impl Into<String>) -> String {
        let record = UrlRecord::new(original_url);

        let id = self.store.next_counter();
        let key = codec::encode(id);
        self.store.put(key.clone(), record.clone());

        self.journal_entry(LogEntry {
            key: key.clone(),
            data: record,
            current_id: id,
        });

        key
    }

    /// Resolve a short key to its original URL, counting the visit.
    ///
    /// The caller gets its answer before the journal append reaches disk; a
    /// crash in that window can lose the click. Accepted latency trade-off.
    pub fn resolve(&self, key: &str) -> Result<String> {
        let (record, current_id) = self
            .store
            .increment_clicks(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        let original_url = record.original_url.clone();
        self.journal_entry(LogEntry {
            key: key.to_string(),
            data: record,
            current_id,
        });

        Ok(original_url)
    }

    /// Look up a record without counting a visit.
    pub fn record(&self, key: &str) -> Option<UrlRecord> {
        self.store.get(key)
    }

    /// All mappings from one consistent copy, ordered by key.
    pub fn list(&self) -> Vec<(String, UrlRecord)> {
        let state = self.store.snapshot();
        let mut entries: Vec<_> = state.urls.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Write a snapshot right now and clear the journal.
    pub fn checkpoint(&self) -> Result<()> {
        snapshot::checkpoint(
            &self.store,
            &self.journal,
            &self.config.path.join(SNAPSHOT_FILE),
        )
    }

    /// Block until every queued journal append is on disk.
    pub fn sync(&self) -> Result<()> {
        self.journal.sync()
    }

    /// The store directory.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn journal_entry(&self, entry: LogEntry) {
        // The in-memory mutation already happened; a failed append narrows
        // durability but must not fail the operation.
        if let Err(e) = self.journal.append(entry) {
            tracing::error!(error = %e, "journal unavailable, mutation not persisted");
        }
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;
        Ok(lock_file)
    }
}

impl Drop for LinkEngine {
    fn drop(&mut self) {
        // Stop the timer first so no cycle races the shutdown; the journal's
        // own Drop then drains whatever is still queued.
        self.snapshots.stop();
    }
}
