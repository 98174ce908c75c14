//! Persistence collaborator for normalized records.
//!
//! The orchestrator only sees [`RecordSink`]; the SQLite store backs the CLI
//! and [`MemorySink`] backs tests.

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteRecordStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::normalize::{NormalizedRecord, RecordKind};

/// Records per upsert transaction.
pub const UPSERT_BATCH_SIZE: usize = 500;

/// Upserts records keyed by `(kind, identifier)`.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Insert or update every record; returns how many rows were written.
    async fn upsert(&self, kind: RecordKind, records: &[NormalizedRecord]) -> Result<usize>;
}
