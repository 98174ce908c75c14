//! `bidradar quality <artifact>` – data quality gate over an artifact.

use anyhow::Result;
use bidradar_core::artifact::read_artifact;
use bidradar_core::quality::{check, QualityThresholds};
use std::path::Path;

pub fn run_quality(artifact: &Path, thresholds: &QualityThresholds, json: bool) -> Result<()> {
    let records = read_artifact(artifact)?;
    let report = check(&records, thresholds);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("records:               {}", report.total);
    println!(
        "duplicates:            {} ({:.2}%, limit {:.2}%)",
        report.duplicate_count, report.duplicate_rate, thresholds.max_duplicate_rate
    );
    println!(
        "missing occurredAt:    {} ({:.2}%, limit {:.2}%)",
        report.missing_occurred_at,
        report.missing_occurred_at_rate,
        thresholds.max_missing_occurred_at_rate
    );
    println!(
        "missing amount:        {} ({:.2}%, limit {:.2}%)",
        report.missing_amount, report.missing_amount_rate, thresholds.max_missing_amount_rate
    );
    println!(
        "non-positive amount:   {} ({:.2}%, limit {:.2}%)",
        report.non_positive_amount,
        report.non_positive_amount_rate,
        thresholds.max_non_positive_amount_rate
    );
    println!("verdict:               {} ({}/4 criteria)", report.verdict, report.criteria_met);
    Ok(())
}
