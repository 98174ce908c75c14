//! `bidradar retry-queue <kind>` – list pages waiting for replay.

use anyhow::Result;
use bidradar_core::normalize::RecordKind;
use bidradar_core::retry_queue::RetryQueueStore;
use std::path::Path;

pub fn run_retry_queue(output_dir: &Path, kind: RecordKind) -> Result<()> {
    let store = RetryQueueStore::for_kind(output_dir, kind);
    let entries = store.load();
    if entries.is_empty() {
        println!("Retry queue {} is empty.", store.path().display());
        return Ok(());
    }
    println!("{:<26} {:<6} {:<8} {}", "FAILED AT", "PAGE", "ATTEMPTS", "OPERATION");
    for e in &entries {
        println!(
            "{:<26} {:<6} {:<8} {}",
            e.failed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            e.page_index,
            e.retry_attempts,
            e.operation_name
        );
    }
    println!("{} entries in {}", entries.len(), store.path().display());
    Ok(())
}
