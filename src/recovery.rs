//! Startup recovery: snapshot load plus journal replay.
//!
//! Recovery never fails fatally. A missing or corrupt snapshot falls back to
//! an empty state, and unparseable journal lines are skipped one at a time.
//! The worst case is booting with an empty store, which beats refusing to
//! boot.

use crate::snapshot;
use crate::types::{LogEntry, StoreState};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// What recovery found on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecoveryReport {
    /// Mappings loaded from the snapshot.
    pub snapshot_urls: usize,
    /// Journal lines successfully replayed.
    pub replayed: usize,
    /// Journal lines skipped as unparseable.
    pub skipped: usize,
}

/// Rebuild store state from the last snapshot plus journal replay.
///
/// Replay is last-write-wins per key: a later line for a key replaces the
/// earlier record wholesale rather than accumulating click deltas, so the
/// final record is exactly the last one written for that key. The counter is
/// raised to the highest value seen anywhere, so it never moves backward
/// across a restart.
pub fn recover(snapshot_path: &Path, journal_path: &Path) -> (StoreState, RecoveryReport) {
    let mut report = RecoveryReport::default();

    let mut state = match snapshot::read_snapshot(snapshot_path) {
        Ok(state) => state,
        Err(e) => {
            if snapshot_path.exists() {
                tracing::warn!(
                    path = %snapshot_path.display(),
                    error = %e,
                    "snapshot unreadable, starting from empty state"
                );
            }
            StoreState::default()
        }
    };
    report.snapshot_urls = state.urls.len();

    let file = match File::open(journal_path) {
        Ok(file) => file,
        Err(_) => return (state, report),
    };

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "journal read stopped early");
                break;
            }
        };
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => {
                state.current_id = state.current_id.max(entry.current_id);
                state.urls.insert(entry.key, entry.data);
                report.replayed += 1;
            }
            Err(e) => {
                report.skipped += 1;
                tracing::warn!(error = %e, "skipping unparseable journal line");
            }
        }
    }

    if report.replayed > 0 || report.skipped > 0 {
        tracing::info!(
            replayed = report.replayed,
            skipped = report.skipped,
            "recovered entries from journal"
        );
    }

    (state, report)
}
