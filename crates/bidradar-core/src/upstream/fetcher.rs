//! One page, many attempts: call, classify, back off, give up into the retry queue.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;

use super::parse::parse_page;
use super::request::{redact_service_key, PageRequest};
use super::Transport;
use crate::normalize::RawRecord;
use crate::retry::{classify, BackoffPolicy, Classification, FailureClass, RetryDecision, Sleeper};
use crate::retry_queue::RetryQueueEntry;

/// Successful page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBatch {
    /// `None` when the page had no items (no data, or past the last page).
    pub items: Option<Vec<RawRecord>>,
    pub total_count: Option<u64>,
}

/// Outcome of fetching one page. Failures never escape as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PageFetch {
    Batch(PageBatch),
    /// Retries exhausted or a terminal failure; the entry is ready for the queue.
    Exhausted(RetryQueueEntry),
}

/// Retrying page fetcher over an injected transport and sleeper.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: BackoffPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>, policy: BackoffPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub async fn fetch_page<R: Rng + Send + ?Sized>(&self, req: &PageRequest, rng: &mut R) -> PageFetch {
        let url = match req.url() {
            Ok(u) => u,
            Err(e) => {
                tracing::error!(page = req.page_no, "cannot build request: {:#}", e);
                return PageFetch::Exhausted(self.exhausted(req));
            }
        };
        tracing::debug!(page = req.page_no, url = %redact_service_key(&url), "requesting page");

        for attempt in 0..self.policy.max_attempts {
            let outcome = self.transport.get(&url).await;
            let class = match classify(&outcome) {
                Classification::Success(doc) => {
                    let page = parse_page(&doc);
                    tracing::debug!(
                        page = req.page_no,
                        attempt,
                        items = page.items.as_ref().map_or(0, Vec::len),
                        total = ?page.total_count,
                        "page fetched"
                    );
                    return PageFetch::Batch(PageBatch {
                        items: page.items,
                        total_count: page.total_count,
                    });
                }
                Classification::Failure(class) => class,
            };

            if class == FailureClass::Terminal {
                tracing::error!(
                    page = req.page_no,
                    attempt,
                    status = ?outcome.status(),
                    "terminal upstream failure, not retrying"
                );
                break;
            }

            match self.policy.decide(attempt, class, rng) {
                RetryDecision::RetryAfter(wait) => {
                    tracing::warn!(
                        page = req.page_no,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        class = class.as_str(),
                        wait_secs = wait.as_secs_f64(),
                        "upstream call failed, backing off"
                    );
                    self.sleeper.sleep(wait).await;
                }
                RetryDecision::NoRetry => {
                    tracing::warn!(
                        page = req.page_no,
                        attempt = attempt + 1,
                        class = class.as_str(),
                        "upstream call failed on final attempt"
                    );
                }
            }
        }

        tracing::error!(
            page = req.page_no,
            operation = req.operation(),
            "page abandoned, recording for replay"
        );
        PageFetch::Exhausted(self.exhausted(req))
    }

    fn exhausted(&self, req: &PageRequest) -> RetryQueueEntry {
        RetryQueueEntry {
            operation_name: req.operation().to_string(),
            request_parameters: req.redacted_params(),
            page_index: req.page_no,
            failed_at: Utc::now(),
            retry_attempts: self.policy.max_attempts,
        }
    }
}
