//! Append-only durability journal.
//!
//! Every committed mutation since the last snapshot is recorded as one JSON
//! line. Physical writes are serialized through a single dedicated writer
//! thread fed by a bounded queue, so concurrent callers can never interleave
//! partial lines. Writer-side I/O failures are logged and never propagate
//! back into the caller's in-memory mutation: the gap between "applied" and
//! "durable" is accepted, not fatal.

use crate::error::{Result, StoreError};
use crate::types::LogEntry;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Default capacity of the writer queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum Command {
    Append(LogEntry),
    /// Truncate the file to empty. Acked, so the snapshot cycle is ordered
    /// against every append queued before it.
    Clear(Sender<Result<()>>),
    /// Barrier: acked once every earlier append has reached disk.
    Sync(Sender<Result<()>>),
}

/// Handle to the journal and its writer thread.
///
/// Dropping the handle closes the queue, drains every queued command, and
/// joins the writer, so a clean shutdown loses nothing that was enqueued.
pub struct Journal {
    path: PathBuf,
    tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl Journal {
    /// Open the journal at `path`, creating it if absent, and start the
    /// writer thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_capacity(path, DEFAULT_QUEUE_CAPACITY)
    }

    /// Open with an explicit writer-queue capacity.
    pub fn with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create eagerly so clear() and recovery always have a file.
        OpenOptions::new().append(true).create(true).open(&path)?;

        let (tx, rx) = bounded(capacity);
        let worker_path = path.clone();
        let worker = thread::Builder::new()
            .name("journal-writer".into())
            .spawn(move || writer_loop(&worker_path, rx))?;

        Ok(Self {
            path,
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queue one entry for appending.
    ///
    /// Blocks only while the queue is full. The physical write happens on
    /// the writer thread; its failures are logged there rather than
    /// returned here.
    pub fn append(&self, entry: LogEntry) -> Result<()> {
        self.sender()?
            .send(Command::Append(entry))
            .map_err(|_| StoreError::JournalClosed)
    }

    /// Truncate the journal to empty.
    ///
    /// Flows through the writer queue, so every append enqueued before the
    /// call is written (and then discarded) first. Only the snapshot cycle
    /// calls this, immediately after a successful snapshot rename.
    pub fn clear(&self) -> Result<()> {
        self.roundtrip(Command::Clear)
    }

    /// Block until every append enqueued so far is flushed and synced.
    pub fn sync(&self) -> Result<()> {
        self.roundtrip(Command::Sync)
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn roundtrip(&self, make: impl FnOnce(Sender<Result<()>>) -> Command) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender()?
            .send(make(ack_tx))
            .map_err(|_| StoreError::JournalClosed)?;
        ack_rx.recv().map_err(|_| StoreError::JournalClosed)?
    }

    fn sender(&self) -> Result<&Sender<Command>> {
        self.tx.as_ref().ok_or(StoreError::JournalClosed)
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain remaining commands.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn writer_loop(path: &Path, rx: Receiver<Command>) {
    let mut writer: Option<BufWriter<File>> = None;

    for command in rx {
        match command {
            Command::Append(entry) => {
                if let Err(e) = write_entry(path, &mut writer, &entry) {
                    // The in-memory mutation already happened; a lost line
                    // narrows durability, not correctness.
                    tracing::error!(key = %entry.key, error = %e, "journal append failed");
                    writer = None;
                }
            }
            Command::Clear(ack) => {
                writer = None;
                let _ = ack.send(truncate(path));
            }
            Command::Sync(ack) => {
                let _ = ack.send(flush(&mut writer));
            }
        }
    }
}

fn write_entry(
    path: &Path,
    writer: &mut Option<BufWriter<File>>,
    entry: &LogEntry,
) -> Result<()> {
    if writer.is_none() {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        *writer = Some(BufWriter::new(file));
    }
    let w = writer.as_mut().expect("writer was just opened");

    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');

    w.write_all(&line)?;
    w.flush()?;
    w.get_ref().sync_all()?;

    Ok(())
}

fn flush(writer: &mut Option<BufWriter<File>>) -> Result<()> {
    if let Some(w) = writer.as_mut() {
        w.flush()?;
        w.get_ref().sync_all()?;
    }
    Ok(())
}

fn truncate(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UrlRecord;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(key: &str, url: &str, current_id: u64) -> LogEntry {
        LogEntry {
            key: key.to_string(),
            data: UrlRecord::new(url),
            current_id,
        }
    }

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_append_writes_one_line_per_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.log");

        let journal = Journal::open(&path).unwrap();
        journal.append(entry("a", "https://a.example", 1)).unwrap();
        journal.append(entry("b", "https://b.example", 2)).unwrap();
        journal.sync().unwrap();

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[1].key, "b");
    }

    #[test]
    fn test_drop_drains_queue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.log");

        {
            let journal = Journal::open(&path).unwrap();
            for i in 0..50u64 {
                journal
                    .append(entry(&format!("k{i}"), "https://example.com", i))
                    .unwrap();
            }
            // No sync: Drop must still write everything queued.
        }

        assert_eq!(read_entries(&path).len(), 50);
    }

    #[test]
    fn test_clear_truncates_after_queued_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.log");

        let journal = Journal::open(&path).unwrap();
        journal.append(entry("a", "https://a.example", 1)).unwrap();
        journal.clear().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        // Still usable after a clear.
        journal.append(entry("b", "https://b.example", 2)).unwrap();
        journal.sync().unwrap();
        assert_eq!(read_entries(&path).len(), 1);
    }

    #[test]
    fn test_concurrent_appenders_never_interleave_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.log");

        let journal = Arc::new(Journal::open(&path).unwrap());
        let threads = 8usize;
        let per_thread = 100usize;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let journal = Arc::clone(&journal);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        journal
                            .append(entry(
                                &format!("t{t}-{i}"),
                                "https://example.com/some/long/enough/path",
                                i as u64,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        journal.sync().unwrap();

        // Every line must parse back as a complete entry.
        let entries = read_entries(&path);
        assert_eq!(entries.len(), threads * per_thread);
    }

    #[test]
    fn test_creates_file_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.log");

        let _journal = Journal::open(&path).unwrap();
        assert!(path.exists());
    }
}
