// log.rs — Append-only JSONL event log.
//
// The log is stored as a JSONL (JSON Lines) file: one JSON object per line.
// This format is simple, append-friendly, and easy to parse with standard
// tools (jq, grep, etc.).
//
// Many request threads share one EventLog. The file handle sits behind a
// single Mutex and each event is written as one complete line inside that
// lock, so concurrent appends never interleave.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::AuditError;
use crate::event::InterceptEvent;

/// An append-only event log backed by a JSONL file.
///
/// `append` takes `&self`: the writer is guarded internally so an
/// `Arc<EventLog>` can be shared across threads without extra locking.
pub struct EventLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    events_written: AtomicU64,
    /// Set after the first failed write has been reported.
    failure_reported: AtomicBool,
}

impl EventLog {
    /// Open (or create) an event log at the given path.
    ///
    /// Missing parent directories are created. Existing content is kept:
    /// the file is opened in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| AuditError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path,
            events_written: AtomicU64::new(0),
            failure_reported: AtomicBool::new(false),
        })
    }

    /// Append an event to the log and flush it.
    pub fn append(&self, event: &InterceptEvent) -> Result<(), AuditError> {
        // Serialize outside the lock; only the write itself is serialized.
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        // A panic in another writer poisons the lock but leaves the file
        // usable, so keep going with the inner guard.
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        self.events_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Append an event, swallowing failures.
    ///
    /// The first failure is reported through `tracing`; later ones are
    /// silent. Used on the request path, where logging must never abort
    /// the in-flight call.
    pub fn record(&self, event: &InterceptEvent) {
        if let Err(e) = self.append(event) {
            if !self.failure_reported.swap(true, Ordering::Relaxed) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to write intercept event; further failures will not be reported"
                );
            }
        }
    }

    /// Number of events successfully written through this handle.
    pub fn events_written(&self) -> u64 {
        self.events_written.load(Ordering::Relaxed)
    }

    /// Return the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all events from a log file, oldest first. Skips blank lines.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<InterceptEvent>, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Read the last `n` events from a log file.
    pub fn tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<InterceptEvent>, AuditError> {
        let mut events = Self::read_all(path)?;
        let start = events.len().saturating_sub(n);
        Ok(events.split_off(start))
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("path", &self.path)
            .field("events_written", &self.events_written())
            .finish()
    }
}
