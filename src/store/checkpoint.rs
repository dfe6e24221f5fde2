//! Checkpointing and durable persistence
//!
//! Two files back a crawl:
//!
//! - the **checkpoint log**: newline-delimited JSON, one record per line,
//!   appended (and flushed) before the record is considered produced, so a
//!   crash loses at most the items currently mid-fetch;
//! - the **snapshot**: the full result store as one pretty-printed JSON
//!   array, written to a temp file and renamed into place so a concurrent
//!   reader never observes a partial document.
//!
//! Startup replays the log over the snapshot (last-write-wins by URL),
//! compacts, and truncates the log, so every run begins from a clean
//! single-snapshot state. Corrupt files are warned about and treated as
//! empty; a crawl that can start beats strict continuity.

use crate::page::PageRecord;
use crate::store::ResultStore;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Manages the snapshot file and the append-only checkpoint log
#[derive(Debug)]
pub struct Checkpointer {
    snapshot_path: PathBuf,
    log_path: PathBuf,
    log_writer: Option<BufWriter<File>>,
}

impl Checkpointer {
    /// Creates a checkpointer, ensuring parent directories exist. Failure
    /// here is fatal: a crawl that cannot persist must not start.
    pub fn new(snapshot_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Result<Self> {
        let snapshot_path = snapshot_path.into();
        let log_path = log_path.into();

        for path in [&snapshot_path, &log_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        Ok(Self {
            snapshot_path,
            log_path,
            log_writer: None,
        })
    }

    /// Loads prior state: snapshot first, then the log replayed over it
    /// (deduplicating by URL, last write wins). Unreadable or corrupt
    /// files degrade to an empty store with a warning.
    pub fn recover(&self) -> ResultStore {
        let mut store = ResultStore::new();

        match std::fs::read_to_string(&self.snapshot_path) {
            Ok(content) => match serde_json::from_str::<Vec<PageRecord>>(&content) {
                Ok(records) => {
                    for record in records {
                        store.insert(record);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Snapshot {} is corrupt ({}); starting from an empty result store",
                        self.snapshot_path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    "Could not read snapshot {}: {}; starting from an empty result store",
                    self.snapshot_path.display(),
                    e
                );
            }
        }

        let replayed = self.replay_log(&mut store);
        if replayed > 0 {
            tracing::info!(
                "Replayed {} checkpointed record(s) from {}",
                replayed,
                self.log_path.display()
            );
        }

        store
    }

    /// Replays the checkpoint log into the store, returning the number of
    /// records recovered. Unparseable lines (e.g. a torn final write) are
    /// skipped with a warning.
    fn replay_log(&self, store: &mut ResultStore) -> usize {
        let file = match File::open(&self.log_path) {
            Ok(f) => f,
            Err(_) => return 0,
        };

        let mut replayed = 0;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PageRecord>(&line) {
                Ok(record) => {
                    store.insert(record);
                    replayed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping unparseable checkpoint log line {}: {}",
                        line_no + 1,
                        e
                    );
                }
            }
        }
        replayed
    }

    /// Appends one record to the checkpoint log and flushes it. Called
    /// before the record is acknowledged in memory, so no record exists
    /// that was not durably logged.
    pub fn append(&mut self, record: &PageRecord) -> Result<()> {
        if self.log_writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)?;
            self.log_writer = Some(BufWriter::new(file));
        }

        let writer = self.log_writer.as_mut().expect("log writer just opened");
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the records as the new snapshot, atomically, then truncates
    /// the checkpoint log. Safe to call repeatedly; a failed temp-file
    /// write is cleaned up and leaves the previous snapshot intact.
    pub fn compact(&mut self, records: &[PageRecord]) -> Result<()> {
        let tmp_path = self.snapshot_path.with_extension("json.tmp");

        if let Err(e) = write_snapshot(&tmp_path, records) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        std::fs::rename(&tmp_path, &self.snapshot_path)?;

        self.truncate_log()?;

        tracing::debug!(
            "Compacted {} record(s) into {}",
            records.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }

    /// Truncates the checkpoint log; its contents are now in the snapshot
    fn truncate_log(&mut self) -> Result<()> {
        // Drop any open append handle so the truncated file gets a fresh one
        self.log_writer = None;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.log_path)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Serializes records to a pretty-printed JSON array at `path`
fn write_snapshot(path: &Path, records: &[PageRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}
