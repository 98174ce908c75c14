use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordSink, UPSERT_BATCH_SIZE};
use crate::normalize::{NormalizedRecord, RecordKind};

/// In-memory sink. Chunks like the SQLite store so batch sizes can be observed.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<HashMap<(RecordKind, String), NormalizedRecord>>,
    batches: Mutex<Vec<usize>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every upsert fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, kind: RecordKind, identifier: &str) -> Option<NormalizedRecord> {
        self.rows
            .lock()
            .ok()?
            .get(&(kind, identifier.to_string()))
            .cloned()
    }

    /// Sizes of the chunks written so far, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn upsert(&self, kind: RecordKind, records: &[NormalizedRecord]) -> Result<usize> {
        if self.fail {
            bail!("memory sink configured to fail");
        }
        let Ok(mut rows) = self.rows.lock() else {
            bail!("memory sink poisoned");
        };
        let Ok(mut batches) = self.batches.lock() else {
            bail!("memory sink poisoned");
        };
        for chunk in records.chunks(UPSERT_BATCH_SIZE) {
            for r in chunk {
                rows.insert((kind, r.identifier.clone()), r.clone());
            }
            batches.push(chunk.len());
        }
        Ok(records.len())
    }
}
