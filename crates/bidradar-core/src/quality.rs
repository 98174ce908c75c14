//! Data quality gate over a run's normalized records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::correlate::percent;
use crate::normalize::NormalizedRecord;

/// Upper bounds (percent, exclusive) for each criterion (`[quality]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub max_duplicate_rate: f64,
    pub max_missing_occurred_at_rate: f64,
    pub max_missing_amount_rate: f64,
    pub max_non_positive_amount_rate: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_duplicate_rate: 3.0,
            max_missing_occurred_at_rate: 1.0,
            max_missing_amount_rate: 2.0,
            max_non_positive_amount_rate: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    ConditionalPass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::ConditionalPass => "CONDITIONAL PASS",
            Verdict::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub total: usize,
    /// Identifiers seen more than once.
    pub duplicate_ids: Vec<String>,
    /// Extra occurrences beyond the first.
    pub duplicate_count: usize,
    pub duplicate_rate: f64,
    pub missing_occurred_at: usize,
    pub missing_occurred_at_rate: f64,
    pub missing_amount: usize,
    pub missing_amount_rate: f64,
    pub non_positive_amount: usize,
    pub non_positive_amount_rate: f64,
    pub criteria_met: u8,
    pub verdict: Verdict,
}

/// Check records against thresholds. Run before identifier dedup so
/// duplicates are visible.
pub fn check(records: &[NormalizedRecord], thresholds: &QualityThresholds) -> QualityReport {
    let total = records.len();

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *seen.entry(r.identifier.as_str()).or_default() += 1;
    }
    let duplicate_ids: Vec<String> = seen
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    let duplicate_count: usize = seen.values().map(|n| n.saturating_sub(1)).sum();

    let missing_occurred_at = records.iter().filter(|r| r.occurred_at.is_none()).count();
    let missing_amount = records.iter().filter(|r| r.amount.is_none()).count();
    let non_positive_amount = records
        .iter()
        .filter(|r| matches!(r.amount, Some(a) if a <= 0.0))
        .count();

    let duplicate_rate = percent(duplicate_count, total);
    let missing_occurred_at_rate = percent(missing_occurred_at, total);
    let missing_amount_rate = percent(missing_amount, total);
    let non_positive_amount_rate = percent(non_positive_amount, total);

    let criteria_met = [
        duplicate_rate < thresholds.max_duplicate_rate,
        missing_occurred_at_rate < thresholds.max_missing_occurred_at_rate,
        missing_amount_rate < thresholds.max_missing_amount_rate,
        non_positive_amount_rate < thresholds.max_non_positive_amount_rate,
    ]
    .iter()
    .filter(|met| **met)
    .count() as u8;

    let verdict = match criteria_met {
        4 => Verdict::Pass,
        2 | 3 => Verdict::ConditionalPass,
        _ => Verdict::Fail,
    };

    QualityReport {
        total,
        duplicate_ids,
        duplicate_count,
        duplicate_rate,
        missing_occurred_at,
        missing_occurred_at_rate,
        missing_amount,
        missing_amount_rate,
        non_positive_amount,
        non_positive_amount_rate,
        criteria_met,
        verdict,
    }
}
