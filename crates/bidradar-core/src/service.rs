//! Request/response types of the collection service boundary.
//!
//! [`handle_collect`] never fails: every problem, including invalid input,
//! comes back as a `failed` response with an error message.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact;
use crate::collect::{default_run_id, new_trace_id, Collector, Mode, RunRequest, RunStatus};
use crate::correlate::MatchReport;
use crate::error::ConfigError;
use crate::normalize::{RecordKind, SourceTag};
use crate::retry::FastSleeper;

const MAX_PAGES: u32 = 10;
const MAX_RECORDS: usize = 1000;

fn default_page_count() -> u32 {
    3
}

/// Mock record count when the request does not name one.
pub fn default_mock_count(kind: RecordKind) -> usize {
    match kind {
        RecordKind::Bid => 200,
        RecordKind::Award => 60,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
    pub mode: Mode,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
    #[serde(default)]
    pub mock_record_count: Option<usize>,
    #[serde(default)]
    pub bids_file_for_correlation: Option<PathBuf>,
    #[serde(default)]
    pub fail_rate: f64,
    /// Replace every backoff wait with a short fixed pause.
    #[serde(default)]
    pub fast_retry: bool,
}

impl CollectRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            run_id: None,
            page_count: default_page_count(),
            mock_record_count: None,
            bids_file_for_correlation: None,
            fail_rate: 0.0,
            fast_retry: false,
        }
    }

    /// Range checks of the service boundary (pages 1..=10, records 1..=1000).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGES).contains(&self.page_count) {
            return Err(ConfigError::OutOfRange {
                field: "pageCount",
                got: u64::from(self.page_count),
                min: 1,
                max: u64::from(MAX_PAGES),
            });
        }
        if let Some(n) = self.mock_record_count {
            if !(1..=MAX_RECORDS).contains(&n) {
                return Err(ConfigError::OutOfRange {
                    field: "mockRecordCount",
                    got: n as u64,
                    min: 1,
                    max: MAX_RECORDS as u64,
                });
            }
        }
        Ok(())
    }

    pub fn to_run_request(&self, kind: RecordKind, run_id: String) -> RunRequest {
        RunRequest {
            kind,
            mode: self.mode,
            run_id: Some(run_id),
            pages: self.page_count,
            mock_count: self
                .mock_record_count
                .unwrap_or_else(|| default_mock_count(kind)),
            fail_rate: self.fail_rate,
            bids_file: self.bids_file_for_correlation.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub status: ResponseStatus,
    pub run_id: String,
    pub trace_id: String,
    pub fetched_items: usize,
    pub stored_items: usize,
    pub errors_count: usize,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_report: Option<MatchReport>,
}

impl CollectResponse {
    fn failed(run_id: String, message: String) -> Self {
        Self {
            status: ResponseStatus::Failed,
            run_id,
            trace_id: new_trace_id(),
            fetched_items: 0,
            stored_items: 0,
            errors_count: 0,
            duration_seconds: 0.0,
            artifact_path: None,
            error_message: Some(message),
            match_report: None,
        }
    }
}

/// Validate, run, and summarize one collection.
///
/// A run that collected nothing still reports `completed`; its failures are
/// visible through `errorsCount` and the retry queue.
pub async fn handle_collect(collector: Collector, kind: RecordKind, req: &CollectRequest) -> CollectResponse {
    let run_id = req
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(kind, Utc::now()));
    if let Err(e) = req.validate() {
        tracing::warn!(run_id = %run_id, "collect request rejected: {}", e);
        return CollectResponse::failed(run_id, e.to_string());
    }

    let collector = if req.fast_retry {
        let wait = Duration::from_millis(collector.config().retry.fast_retry_wait_ms);
        collector.with_sleeper(Arc::new(FastSleeper { wait }))
    } else {
        collector
    };

    let run_req = req.to_run_request(kind, run_id.clone());
    match collector.run(&run_req).await {
        Ok(report) => CollectResponse {
            status: match report.status {
                RunStatus::Completed | RunStatus::NoRecords => ResponseStatus::Completed,
                RunStatus::Failed => ResponseStatus::Failed,
            },
            run_id: report.run.run_id.clone(),
            trace_id: report.trace_id.clone(),
            fetched_items: report.fetched,
            stored_items: report.stored,
            errors_count: report.errors_count,
            duration_seconds: report.duration_seconds,
            artifact_path: report.artifact_path.as_ref().map(|p| p.display().to_string()),
            error_message: report.error_message.clone(),
            match_report: report.match_report.clone(),
        },
        Err(e) => {
            tracing::error!(run_id = %run_id, "collect failed: {:#}", e);
            CollectResponse::failed(run_id, format!("{:#}", e))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusResponse {
    pub run_id: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// `completed` or `not_found`.
    pub status: String,
}

/// Look up a run's artifact under either source tag.
pub fn run_status(output_dir: &Path, kind: RecordKind, run_id: &str) -> RunStatusResponse {
    for source in [SourceTag::Mock, SourceTag::LiveApi] {
        let path = artifact::artifact_path(output_dir, kind, source, run_id);
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };
        let records = match artifact::read_artifact(&path) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("unreadable artifact: {:#}", e);
                continue;
            }
        };
        let last_modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Local>::from(t).to_rfc3339());
        return RunStatusResponse {
            run_id: run_id.to_string(),
            exists: true,
            file_path: Some(path.display().to_string()),
            file_size_bytes: Some(meta.len()),
            record_count: Some(records.len()),
            last_modified,
            status: "completed".to_string(),
        };
    }
    RunStatusResponse {
        run_id: run_id.to_string(),
        exists: false,
        file_path: None,
        file_size_bytes: None,
        record_count: None,
        last_modified: None,
        status: "not_found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectorConfig;
    use crate::retry::RecordingSleeper;

    fn collector(dir: &Path) -> Collector {
        Collector::new(CollectorConfig {
            output_dir: dir.to_path_buf(),
            ..CollectorConfig::default()
        })
        .with_sleeper(Arc::new(RecordingSleeper::new()))
        .with_seed(4)
    }

    #[test]
    fn request_defaults_from_json() {
        let req: CollectRequest = serde_json::from_str(r#"{"mode": "mock"}"#).unwrap();
        assert_eq!(req, CollectRequest::new(Mode::Mock));
        let run = req.to_run_request(RecordKind::Bid, "r".into());
        assert_eq!(run.mock_count, 200);
        assert_eq!(run.pages, 3);
        assert_eq!(req.to_run_request(RecordKind::Award, "r".into()).mock_count, 60);
    }

    #[test]
    fn ranges_are_enforced() {
        let mut req = CollectRequest::new(Mode::Live);
        req.page_count = 11;
        assert!(matches!(req.validate(), Err(ConfigError::OutOfRange { field: "pageCount", .. })));
        req.page_count = 10;
        req.mock_record_count = Some(0);
        assert!(matches!(
            req.validate(),
            Err(ConfigError::OutOfRange { field: "mockRecordCount", .. })
        ));
        req.mock_record_count = Some(1000);
        assert!(req.validate().is_ok());
    }

    #[tokio::test]
    async fn mock_collect_completes() {
        let dir = tempfile::tempdir().unwrap();
        let req = CollectRequest {
            run_id: Some("svc1".into()),
            mock_record_count: Some(10),
            ..CollectRequest::new(Mode::Mock)
        };
        let resp = handle_collect(collector(dir.path()), RecordKind::Award, &req).await;
        assert_eq!(resp.status, ResponseStatus::Completed);
        assert_eq!(resp.run_id, "svc1");
        assert_eq!(resp.fetched_items, 10);
        assert_eq!(resp.errors_count, 0);
        assert!(resp.trace_id.starts_with("trace_"));
        assert!(resp.artifact_path.unwrap().ends_with("collected_awards_mock_svc1.json"));

        let status = run_status(dir.path(), RecordKind::Award, "svc1");
        assert!(status.exists);
        assert_eq!(status.record_count, Some(10));
        assert_eq!(status.status, "completed");
        assert!(!run_status(dir.path(), RecordKind::Bid, "svc1").exists);
    }

    #[tokio::test]
    async fn certain_failure_with_fast_retry_completes_with_errors() {
        let dir = tempfile::tempdir().unwrap();
        let req = CollectRequest {
            fail_rate: 1.0,
            fast_retry: true,
            ..CollectRequest::new(Mode::Mock)
        };
        let mut config = CollectorConfig {
            output_dir: dir.path().to_path_buf(),
            ..CollectorConfig::default()
        };
        config.retry.fast_retry_wait_ms = 1;
        let resp = handle_collect(Collector::new(config), RecordKind::Award, &req).await;
        assert_eq!(resp.status, ResponseStatus::Completed);
        assert_eq!(resp.fetched_items, 0);
        assert_eq!(resp.errors_count, 1);
        assert!(resp.artifact_path.is_none());
    }

    #[tokio::test]
    async fn invalid_requests_become_failed_responses() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = CollectRequest::new(Mode::Mock);
        req.fail_rate = 3.0;
        let resp = handle_collect(collector(dir.path()), RecordKind::Bid, &req).await;
        assert_eq!(resp.status, ResponseStatus::Failed);
        assert!(resp.error_message.unwrap().contains("fail rate"));

        let live = CollectRequest::new(Mode::Live);
        let resp = handle_collect(collector(dir.path()), RecordKind::Bid, &live).await;
        assert_eq!(resp.status, ResponseStatus::Failed);
        assert!(resp.error_message.unwrap().contains("API key"));
    }

    #[test]
    fn response_json_is_camel_case() {
        let resp = CollectResponse::failed("r1".into(), "boom".into());
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["runId"], "r1");
        assert_eq!(v["errorMessage"], "boom");
        assert!(v.get("artifactPath").is_none());
    }
}
