//! `bidradar run-status <run-id>` – locate a run's artifact.

use anyhow::Result;
use bidradar_core::normalize::RecordKind;
use bidradar_core::service::run_status;
use std::path::Path;

pub fn run_run_status(output_dir: &Path, kind: RecordKind, run_id: &str) -> Result<()> {
    let status = run_status(output_dir, kind, run_id);
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
