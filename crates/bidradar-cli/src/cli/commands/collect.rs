//! `bidradar collect <kind>` – run one collection through the service boundary.

use anyhow::{bail, Result};
use bidradar_core::collect::{Collector, Mode};
use bidradar_core::config::{self, CollectorConfig};
use bidradar_core::normalize::RecordKind;
use bidradar_core::service::{handle_collect, CollectRequest, ResponseStatus};
use bidradar_core::store::SqliteRecordStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Parsed `collect` arguments.
#[derive(Debug)]
pub struct CollectArgs {
    pub kind: RecordKind,
    pub mode: Mode,
    pub pages: u32,
    pub count: Option<usize>,
    pub run_id: Option<String>,
    pub fail_rate: f64,
    pub fast_retry: bool,
    pub bids_file: Option<PathBuf>,
    pub json: bool,
}

pub async fn run_collect(cfg: CollectorConfig, args: CollectArgs) -> Result<()> {
    let persist = cfg.persist;
    let mut collector = Collector::new(cfg).with_api_key(config::api_key_from_env());
    if persist {
        let store = SqliteRecordStore::open_default().await?;
        collector = collector.with_sink(Arc::new(store));
    }

    let req = CollectRequest {
        mode: args.mode,
        run_id: args.run_id,
        page_count: args.pages,
        mock_record_count: args.count,
        bids_file_for_correlation: args.bids_file,
        fail_rate: args.fail_rate,
        fast_retry: args.fast_retry,
    };
    let resp = handle_collect(collector, args.kind, &req).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!("run:        {}", resp.run_id);
        println!("trace:      {}", resp.trace_id);
        println!(
            "status:     {}",
            match resp.status {
                ResponseStatus::Completed => "completed",
                ResponseStatus::Failed => "failed",
            }
        );
        println!("fetched:    {}", resp.fetched_items);
        println!("stored:     {}", resp.stored_items);
        println!("errors:     {}", resp.errors_count);
        println!("duration:   {:.2}s", resp.duration_seconds);
        if let Some(path) = &resp.artifact_path {
            println!("artifact:   {path}");
        }
        if let Some(m) = &resp.match_report {
            println!(
                "match rate: {:.2}% ({}/{} awards, {} bids)",
                m.rate, m.matched_count, m.total_awards, m.total_bids
            );
        }
    }

    if resp.status == ResponseStatus::Failed {
        bail!(
            "collection failed: {}",
            resp.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
