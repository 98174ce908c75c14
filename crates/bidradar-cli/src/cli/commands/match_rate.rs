//! `bidradar match <awards> <bids>` – join match rate between two artifacts.

use anyhow::Result;
use bidradar_core::artifact::read_artifact;
use bidradar_core::correlate::{load_bid_identifiers, match_rate};
use std::path::Path;

pub fn run_match(awards: &Path, bids: &Path) -> Result<()> {
    let awards = read_artifact(awards)?;
    let bid_ids = load_bid_identifiers(bids)?;
    let report = match_rate(&awards, &bid_ids);
    println!(
        "match rate: {:.2}% ({}/{} awards matched against {} bids)",
        report.rate, report.matched_count, report.total_awards, report.total_bids
    );
    Ok(())
}
