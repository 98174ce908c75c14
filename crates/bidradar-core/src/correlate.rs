//! Bid/award join on the announcement number.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::normalize::NormalizedRecord;

/// How many awards have a matching bid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    /// Percentage, rounded to two decimals.
    pub rate: f64,
    pub matched_count: usize,
    pub total_awards: usize,
    pub total_bids: usize,
}

/// `part / whole * 100` rounded to two decimals; 0 when `whole` is 0.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

pub fn match_rate(awards: &[NormalizedRecord], bid_ids: &HashSet<String>) -> MatchReport {
    let matched_count = awards
        .iter()
        .filter(|a| bid_ids.contains(&a.identifier))
        .count();
    MatchReport {
        rate: percent(matched_count, awards.len()),
        matched_count,
        total_awards: awards.len(),
        total_bids: bid_ids.len(),
    }
}

/// Identifiers from a bid artifact: an array of objects with `identifier`
/// (or the older `id` field).
pub fn load_bid_identifiers(path: &Path) -> Result<HashSet<String>> {
    let bytes = std::fs::read(path).with_context(|| format!("read bids: {}", path.display()))?;
    let doc: Vec<Value> =
        serde_json::from_slice(&bytes).with_context(|| format!("parse bids: {}", path.display()))?;
    Ok(doc
        .iter()
        .filter_map(|item| item.get("identifier").or_else(|| item.get("id")))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

/// Like [`match_rate`] against a bid file; a missing or malformed file
/// yields a zero report with `total_awards` still set.
pub fn match_rate_from_file(awards: &[NormalizedRecord], bids_path: &Path) -> MatchReport {
    match load_bid_identifiers(bids_path) {
        Ok(ids) => match_rate(awards, &ids),
        Err(e) => {
            tracing::warn!("bid/award correlation skipped: {:#}", e);
            MatchReport {
                total_awards: awards.len(),
                ..MatchReport::default()
            }
        }
    }
}
