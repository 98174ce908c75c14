use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::request::Mode;
use crate::correlate::MatchReport;
use crate::normalize::{NormalizedRecord, RecordKind, SourceTag};
use crate::quality::QualityReport;
use crate::retry_queue::RetryQueueEntry;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Collecting { page: u32 },
    Normalizing,
    Correlating,
    Persisting,
    Finalized,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Collecting { page } => write!(f, "collecting(page {page})"),
            RunState::Normalizing => f.write_str("normalizing"),
            RunState::Correlating => f.write_str("correlating"),
            RunState::Persisting => f.write_str("persisting"),
            RunState::Finalized => f.write_str("finalized"),
        }
    }
}

/// Everything one run produced. Owned by the collector until finalized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRun {
    pub run_id: String,
    pub mode: Mode,
    pub kind: RecordKind,
    pub source_tag: SourceTag,
    /// Live: page budget. Mock: requested record count.
    pub target: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub records: Vec<NormalizedRecord>,
    pub retry_queue_entries: Vec<RetryQueueEntry>,
    pub rejected_count: usize,
    pub state: RunState,
}

impl CollectionRun {
    pub(crate) fn new(run_id: String, mode: Mode, kind: RecordKind, target: u64) -> Self {
        Self {
            run_id,
            mode,
            kind,
            source_tag: mode.source_tag(),
            target,
            started_at: Utc::now(),
            finished_at: None,
            records: Vec::new(),
            retry_queue_entries: Vec::new(),
            rejected_count: 0,
            state: RunState::Idle,
        }
    }

    pub(crate) fn advance(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    /// Seal the run. Later calls are ignored.
    pub(crate) fn finalize(&mut self) {
        if self.state == RunState::Finalized {
            return;
        }
        self.finished_at = Some(Utc::now());
        self.advance(RunState::Finalized);
    }

    pub fn is_finalized(&self) -> bool {
        self.state == RunState::Finalized
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// At least one record collected and everything persisted.
    Completed,
    /// Nothing collected; failed pages are in the retry queue.
    NoRecords,
    /// Artifact or store write failed.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Completed => "completed",
            RunStatus::NoRecords => "no_records",
            RunStatus::Failed => "failed",
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run: CollectionRun,
    pub trace_id: String,
    pub status: RunStatus,
    /// Distinct records after normalization.
    pub fetched: usize,
    /// Records written to the store.
    pub stored: usize,
    /// Pages (or mock runs) that ended in the retry queue.
    pub errors_count: usize,
    pub rejected_count: usize,
    pub duration_seconds: f64,
    pub artifact_path: Option<PathBuf>,
    pub retry_queue_added: usize,
    pub match_report: Option<MatchReport>,
    pub quality: QualityReport,
    pub error_message: Option<String>,
}

impl RunReport {
    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.run.records
    }
}
