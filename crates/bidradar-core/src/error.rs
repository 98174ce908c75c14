//! Configuration errors: the only failures that abort a run, raised before any page is attempted.

/// Invalid run or collector configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("fail rate must be within 0.0..=1.0, got {0}")]
    InvalidFailRate(f64),
    #[error("live mode requires an API key (set DATA_PORTAL_API_KEY)")]
    MissingApiKey,
    #[error("retry.max_attempts must be at least 1")]
    ZeroMaxAttempts,
    #[error("page_size must be at least 1")]
    ZeroPageSize,
    #[error("page count must be at least 1")]
    ZeroPages,
    #[error("mock record count must be at least 1")]
    ZeroRecordCount,
    #[error("{field} must be within {min}..={max}, got {got}")]
    OutOfRange {
        field: &'static str,
        got: u64,
        min: u64,
        max: u64,
    },
    #[error("retry.{field} must be a finite number of seconds within 0..={max}, got {value}")]
    InvalidBackoff {
        field: &'static str,
        value: f64,
        max: f64,
    },
    #[error("days_back must be within 0..={max}, got {got}")]
    InvalidDaysBack { got: i64, max: i64 },
    #[error("run id {0:?} may only contain ASCII letters, digits, '-', '_' or '.'")]
    InvalidRunId(String),
}

/// Run ids end up in file names, so keep them to a conservative character set.
pub fn validate_run_id(run_id: &str) -> Result<(), ConfigError> {
    let ok = !run_id.is_empty()
        && !run_id.starts_with('.')
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidRunId(run_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_accepts_timestamps_and_prefixes() {
        assert!(validate_run_id("20240115_103000").is_ok());
        assert!(validate_run_id("api_awards_20240115_103000").is_ok());
        assert!(validate_run_id("prod-001.v2").is_ok());
    }

    #[test]
    fn run_id_rejects_path_like_values() {
        assert!(validate_run_id("").is_err());
        assert!(validate_run_id("../escape").is_err());
        assert!(validate_run_id("a/b").is_err());
        assert!(validate_run_id(".hidden").is_err());
    }

    #[test]
    fn out_of_range_message_names_field() {
        let e = ConfigError::OutOfRange {
            field: "pageCount",
            got: 11,
            min: 1,
            max: 10,
        };
        assert_eq!(e.to_string(), "pageCount must be within 1..=10, got 11");
    }
}
