//! Durable log of pages that exhausted their retries, merged across runs.
//!
//! One JSON document per record kind: `{"queue": [RetryQueueEntry, ...]}`.
//! Writes go through a temp file and rename, so concurrent writers end up
//! with last-writer-wins rather than a torn file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::normalize::RecordKind;

/// One exhausted retry sequence, enough to replay the request later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryQueueEntry {
    pub operation_name: String,
    pub request_parameters: BTreeMap<String, Value>,
    pub page_index: u32,
    pub failed_at: DateTime<Utc>,
    pub retry_attempts: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    #[serde(default)]
    queue: Vec<RetryQueueEntry>,
}

/// File-backed retry queue for one record kind.
#[derive(Debug, Clone)]
pub struct RetryQueueStore {
    path: PathBuf,
}

impl RetryQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/retry_queue_<kind>s.json`.
    pub fn for_kind(dir: &Path, kind: RecordKind) -> Self {
        Self::new(dir.join(format!("retry_queue_{}.json", kind.plural())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted entries. A missing or unreadable file is an empty queue.
    pub fn load(&self) -> Vec<RetryQueueEntry> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "retry queue unreadable, treating as empty: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<QueueFile>(&bytes) {
            Ok(file) => file.queue,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "retry queue corrupt, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Append entries to the persisted queue and return the new total.
    /// An empty slice performs no I/O at all.
    pub fn append(&self, entries: &[RetryQueueEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut queue = self.load();
        queue.extend_from_slice(entries);
        let total = queue.len();
        self.write(&QueueFile { queue })?;
        tracing::info!(
            path = %self.path.display(),
            added = entries.len(),
            total,
            "retry queue updated"
        );
        Ok(total)
    }

    fn write(&self, file: &QueueFile) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).with_context(|| format!("create dir: {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, file).context("serialize retry queue")?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("write retry queue: {}", self.path.display()))?;
        Ok(())
    }
}
