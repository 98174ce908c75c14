//! Per-field parsers. Every parser degrades to `None` instead of failing.

use chrono::{NaiveDate, NaiveDateTime};

/// Midnight of the `YYYYMMDD` prefix (e.g. `"20240115 10:00"`). Anything else is `None`.
pub fn parse_date_prefix(value: &str) -> Option<NaiveDateTime> {
    let prefix = value.trim().get(..8)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%Y%m%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

fn strip_separators(value: &str) -> String {
    value.trim().replace(',', "")
}

/// Floating-point amount or rate with thousands separators removed.
pub fn parse_number(value: &str) -> Option<f64> {
    strip_separators(value)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Integer count with thousands separators removed. `"3.0"` is not an integer.
pub fn parse_count(value: &str) -> Option<i64> {
    strip_separators(value).parse::<i64>().ok()
}
