//! Collection run orchestration.
//!
//! A run walks `Idle → Collecting{page} → Normalizing → Correlating →
//! Persisting → Finalized`. Upstream failures never abort a run: failed pages
//! go to the retry queue and the run carries on. Only configuration errors
//! are returned as `Err`, and always before the first page.

mod report;
mod request;

pub use report::{CollectionRun, RunReport, RunState, RunStatus};
pub use request::{default_run_id, new_trace_id, Mode, RunRequest};

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::artifact;
use crate::config::CollectorConfig;
use crate::correlate::{self, MatchReport};
use crate::mock;
use crate::normalize::{dedup_by_identifier, NormalizedRecord, Normalizer, RawRecord, RecordKind};
use crate::quality;
use crate::retry::{BackoffPolicy, Sleeper, TokioSleeper};
use crate::retry_queue::{RetryQueueEntry, RetryQueueStore};
use crate::store::RecordSink;
use crate::upstream::{inquiry_window, CurlTransport, Endpoint, Fetcher, PageFetch, PageRequest, Transport};

/// Runs collections with injected transport, sleeper and persistence.
pub struct Collector {
    config: CollectorConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    sink: Option<Arc<dyn RecordSink>>,
    api_key: Option<String>,
    seed: Option<u64>,
    today: Option<NaiveDate>,
}

/// What the collecting phase produced.
struct Collected {
    raws: Vec<RawRecord>,
    entries: Vec<RetryQueueEntry>,
}

impl Collector {
    /// Production defaults: libcurl transport, real sleeps, no store.
    pub fn new(config: CollectorConfig) -> Self {
        let transport = Arc::new(CurlTransport::from_config(&config.upstream));
        let seed = config.mock.seed;
        Self {
            config,
            transport,
            sleeper: Arc::new(TokioSleeper),
            sink: None,
            api_key: None,
            seed,
            today: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Fix the RNG used for jitter, failure injection and mock data.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pin "today" for the inquiry window and mock identifiers.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub async fn run(&self, req: &RunRequest) -> Result<RunReport> {
        self.config.validate()?;
        req.validate(self.api_key.as_deref())?;

        let run_id = req
            .run_id
            .clone()
            .unwrap_or_else(|| default_run_id(req.kind, Utc::now()));
        let trace_id = new_trace_id();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            trace_id = %trace_id,
            kind = req.kind.as_str(),
            mode = req.mode.as_str()
        );
        self.execute(req, run_id, trace_id).instrument(span).await
    }

    async fn execute(&self, req: &RunRequest, run_id: String, trace_id: String) -> Result<RunReport> {
        let started = Instant::now();
        let target = match req.mode {
            Mode::Mock => req.mock_count as u64,
            Mode::Live => u64::from(req.pages),
        };
        let mut run = CollectionRun::new(run_id, req.mode, req.kind, target);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let policy = BackoffPolicy::from_config(&self.config.retry);
        tracing::info!(target_count = target, "collection started");

        let Collected { raws, entries } = match req.mode {
            Mode::Mock => self.collect_mock(req, &mut run, &policy, &mut rng).await,
            Mode::Live => self.collect_live(req, &mut run, policy, &mut rng).await,
        };
        let errors_count = entries.len();

        run.advance(RunState::Normalizing);
        let mut normalizer = Normalizer::new(req.kind, run.source_tag);
        let normalized = normalizer.normalize_batch(&raws);
        let quality = quality::check(&normalized, &self.config.quality);
        let (records, folded) = dedup_by_identifier(normalized);
        if folded > 0 {
            tracing::warn!(folded, "duplicate identifiers folded");
        }
        tracing::info!(
            raw = raws.len(),
            normalized = records.len(),
            rejected = normalizer.rejected(),
            verdict = %quality.verdict,
            "normalization done"
        );

        run.advance(RunState::Correlating);
        let match_report = self.correlate(req, &records);

        run.advance(RunState::Persisting);
        let retry_queue_added = self.flush_retry_queue(req.kind, &entries);
        let mut artifact_path = None;
        let mut stored = 0;
        let mut error_message = None;
        if !records.is_empty() {
            let persisted = match self.write_artifact(req.kind, &run, &records) {
                Ok(path) => {
                    artifact_path = Some(path);
                    self.store(req.kind, &records).await
                }
                Err(e) => Err(e),
            };
            match persisted {
                Ok(n) => stored = n,
                Err(e) => {
                    tracing::error!("persisting run failed: {:#}", e);
                    error_message = Some(format!("{:#}", e));
                }
            }
        }

        let status = if error_message.is_some() {
            RunStatus::Failed
        } else if records.is_empty() {
            RunStatus::NoRecords
        } else {
            RunStatus::Completed
        };

        let fetched = records.len();
        run.records = records;
        run.retry_queue_entries = entries;
        run.rejected_count = normalizer.rejected();
        run.finalize();

        let duration_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        tracing::info!(
            %status,
            fetched,
            stored,
            errors_count,
            duration_seconds,
            "collection finished"
        );

        Ok(RunReport {
            trace_id,
            status,
            fetched,
            stored,
            errors_count,
            rejected_count: run.rejected_count,
            duration_seconds,
            artifact_path,
            retry_queue_added,
            match_report,
            quality,
            error_message,
            run,
        })
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    async fn collect_mock(
        &self,
        req: &RunRequest,
        run: &mut CollectionRun,
        policy: &BackoffPolicy,
        rng: &mut StdRng,
    ) -> Collected {
        run.advance(RunState::Collecting { page: 1 });
        if req.fail_rate > 0.0 && rng.gen::<f64>() < req.fail_rate {
            let entry = mock::simulate_failure(policy, self.sleeper.as_ref(), req.fail_rate, rng).await;
            return Collected {
                raws: Vec::new(),
                entries: vec![entry],
            };
        }
        Collected {
            raws: mock::generate(req.kind, req.mock_count, self.today(), rng),
            entries: Vec::new(),
        }
    }

    async fn collect_live(
        &self,
        req: &RunRequest,
        run: &mut CollectionRun,
        policy: BackoffPolicy,
        rng: &mut StdRng,
    ) -> Collected {
        // Validated before the run starts.
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let upstream = &self.config.upstream;
        let endpoint = Endpoint::for_kind(req.kind, upstream);
        let window = inquiry_window(self.today(), self.config.days_back);
        let fetcher = Fetcher::new(self.transport.clone(), self.sleeper.clone(), policy);
        let delay = self.config.inter_page_delay();

        let mut raws = Vec::new();
        let mut entries = Vec::new();
        for page in 1..=req.pages {
            run.advance(RunState::Collecting { page });
            let page_req = PageRequest::new(
                endpoint.clone(),
                api_key,
                page,
                self.config.page_size,
                &upstream.inquiry_division,
                window,
            );
            match fetcher.fetch_page(&page_req, rng).await {
                PageFetch::Batch(batch) => {
                    let Some(items) = batch.items else {
                        if page == 1 {
                            tracing::info!(page, "upstream returned no data");
                        } else {
                            tracing::info!(page, "no more pages");
                        }
                        break;
                    };
                    tracing::info!(page, items = items.len(), total = ?batch.total_count, "page collected");
                    raws.extend(items);
                    if page < req.pages && !delay.is_zero() {
                        self.sleeper.sleep(delay).await;
                    }
                }
                PageFetch::Exhausted(entry) => {
                    tracing::warn!(page, "page failed, skipping");
                    entries.push(entry);
                }
            }
        }
        Collected { raws, entries }
    }

    fn correlate(&self, req: &RunRequest, records: &[NormalizedRecord]) -> Option<MatchReport> {
        let bids_file = req.bids_file.as_deref()?;
        if req.kind != RecordKind::Award {
            tracing::warn!("bid file given for a bid run, correlation skipped");
            return None;
        }
        let report = correlate::match_rate_from_file(records, bids_file);
        tracing::info!(
            rate = report.rate,
            matched = report.matched_count,
            awards = report.total_awards,
            bids = report.total_bids,
            "bid/award correlation"
        );
        Some(report)
    }

    /// Returns how many entries were added; write failures are logged, not raised.
    fn flush_retry_queue(&self, kind: RecordKind, entries: &[RetryQueueEntry]) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let store = RetryQueueStore::for_kind(&self.config.output_dir, kind);
        match store.append(entries) {
            Ok(_) => entries.len(),
            Err(e) => {
                tracing::warn!(path = %store.path().display(), "retry queue flush failed: {:#}", e);
                0
            }
        }
    }

    fn write_artifact(
        &self,
        kind: RecordKind,
        run: &CollectionRun,
        records: &[NormalizedRecord],
    ) -> Result<PathBuf> {
        let path = artifact::artifact_path(&self.config.output_dir, kind, run.source_tag, &run.run_id);
        artifact::write_artifact(&path, records)?;
        tracing::info!(path = %path.display(), records = records.len(), "artifact written");
        Ok(path)
    }

    /// Upsert into the sink; 0 when persistence is off or no sink is set.
    async fn store(&self, kind: RecordKind, records: &[NormalizedRecord]) -> Result<usize> {
        match (&self.sink, self.config.persist) {
            (Some(sink), true) => sink.upsert(kind, records).await,
            _ => Ok(0),
        }
    }
}
