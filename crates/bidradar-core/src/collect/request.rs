use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{validate_run_id, ConfigError};
use crate::normalize::{RecordKind, SourceTag};

/// Where records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Generated offline, with optional failure injection.
    Mock,
    /// The open-data API.
    #[serde(alias = "real")]
    Live,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Mock => "mock",
            Mode::Live => "live",
        }
    }

    pub fn source_tag(self) -> SourceTag {
        match self {
            Mode::Mock => SourceTag::Mock,
            Mode::Live => SourceTag::LiveApi,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "live" | "real" => Ok(Mode::Live),
            other => Err(format!("unknown mode: {other} (expected mock or live)")),
        }
    }
}

/// Parameters of one collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub kind: RecordKind,
    pub mode: Mode,
    /// Generated from the kind and start time when absent.
    pub run_id: Option<String>,
    /// Live mode: maximum number of pages.
    pub pages: u32,
    /// Mock mode: number of records to generate.
    pub mock_count: usize,
    /// Mock mode: probability in `0.0..=1.0` that the run fails.
    pub fail_rate: f64,
    /// Award runs: bid artifact to correlate against.
    pub bids_file: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(kind: RecordKind, mode: Mode) -> Self {
        Self {
            kind,
            mode,
            run_id: None,
            pages: 1,
            mock_count: 10,
            fail_rate: 0.0,
            bids_file: None,
        }
    }

    /// Checks that must pass before any page is attempted.
    pub fn validate(&self, api_key: Option<&str>) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fail_rate) {
            return Err(ConfigError::InvalidFailRate(self.fail_rate));
        }
        if let Some(id) = &self.run_id {
            validate_run_id(id)?;
        }
        match self.mode {
            Mode::Mock if self.mock_count == 0 => Err(ConfigError::ZeroRecordCount),
            Mode::Live if self.pages == 0 => Err(ConfigError::ZeroPages),
            Mode::Live if api_key.map_or(true, |k| k.trim().is_empty()) => {
                Err(ConfigError::MissingApiKey)
            }
            _ => Ok(()),
        }
    }
}

/// `<kind>s_YYYYMMDD_HHMMSS`
pub fn default_run_id(kind: RecordKind, at: DateTime<Utc>) -> String {
    format!("{}_{}", kind.plural(), at.format("%Y%m%d_%H%M%S"))
}

/// `trace_` followed by 12 hex characters.
pub fn new_trace_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("trace_{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mode_parses_real_as_live() {
        assert_eq!("real".parse::<Mode>().unwrap(), Mode::Live);
        assert_eq!("MOCK".parse::<Mode>().unwrap(), Mode::Mock);
        assert!("replay".parse::<Mode>().is_err());
        let m: Mode = serde_json::from_str("\"real\"").unwrap();
        assert_eq!(m, Mode::Live);
    }

    #[test]
    fn fail_rate_outside_unit_interval_is_rejected() {
        let mut req = RunRequest::new(RecordKind::Award, Mode::Mock);
        req.fail_rate = 1.5;
        assert_eq!(req.validate(None), Err(ConfigError::InvalidFailRate(1.5)));
        req.fail_rate = -0.1;
        assert!(req.validate(None).is_err());
        req.fail_rate = f64::NAN;
        assert!(req.validate(None).is_err());
        req.fail_rate = 1.0;
        assert!(req.validate(None).is_ok());
    }

    #[test]
    fn live_mode_requires_api_key() {
        let req = RunRequest::new(RecordKind::Bid, Mode::Live);
        assert_eq!(req.validate(None), Err(ConfigError::MissingApiKey));
        assert_eq!(req.validate(Some("  ")), Err(ConfigError::MissingApiKey));
        assert!(req.validate(Some("key")).is_ok());
    }

    #[test]
    fn zero_pages_or_records_are_rejected() {
        let mut live = RunRequest::new(RecordKind::Bid, Mode::Live);
        live.pages = 0;
        assert_eq!(live.validate(Some("k")), Err(ConfigError::ZeroPages));
        let mut mock = RunRequest::new(RecordKind::Bid, Mode::Mock);
        mock.mock_count = 0;
        assert_eq!(mock.validate(None), Err(ConfigError::ZeroRecordCount));
    }

    #[test]
    fn bad_run_id_is_rejected() {
        let mut req = RunRequest::new(RecordKind::Award, Mode::Mock);
        req.run_id = Some("../x".into());
        assert!(matches!(req.validate(None), Err(ConfigError::InvalidRunId(_))));
    }

    #[test]
    fn run_and_trace_id_formats() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(default_run_id(RecordKind::Award, at), "awards_20240115_103000");
        let t = new_trace_id();
        assert_eq!(t.len(), "trace_".len() + 12);
        assert!(t["trace_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_trace_id(), t);
    }
}
