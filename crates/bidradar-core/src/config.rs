use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::quality::QualityThresholds;

/// Environment variable holding the open-data portal service key (decoding key).
pub const API_KEY_ENV: &str = "DATA_PORTAL_API_KEY";

/// Upper bound for any configured backoff base or jitter, in seconds.
pub const MAX_BACKOFF_SECS: f64 = 86_400.0;

/// Upper bound for the inquiry window, in days.
pub const MAX_DAYS_BACK: i64 = 3650;

/// Backoff parameters per failure class (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per page (including the first).
    pub max_attempts: u32,
    /// 429 responses: `base * (attempt + 1) + U(0, jitter)`.
    pub rate_limited_base_secs: f64,
    pub rate_limited_jitter_secs: f64,
    /// 5xx responses: `base * (attempt + 1) + U(0, jitter)`.
    pub server_error_base_secs: f64,
    pub server_error_jitter_secs: f64,
    /// Timeouts: `base * (attempt + 1) + U(0, jitter)`.
    pub timeout_base_secs: f64,
    pub timeout_jitter_secs: f64,
    /// Other transport errors: flat `base + U(0, jitter)`.
    pub transport_base_secs: f64,
    pub transport_jitter_secs: f64,
    /// Wait used instead of the computed backoff in fast-retry mode.
    pub fast_retry_wait_ms: u64,
}

impl RetryConfig {
    /// Every base/jitter value with its config key.
    fn seconds_fields(&self) -> [(&'static str, f64); 8] {
        [
            ("rate_limited_base_secs", self.rate_limited_base_secs),
            ("rate_limited_jitter_secs", self.rate_limited_jitter_secs),
            ("server_error_base_secs", self.server_error_base_secs),
            ("server_error_jitter_secs", self.server_error_jitter_secs),
            ("timeout_base_secs", self.timeout_base_secs),
            ("timeout_jitter_secs", self.timeout_jitter_secs),
            ("transport_base_secs", self.transport_base_secs),
            ("transport_jitter_secs", self.transport_jitter_secs),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        for (field, value) in self.seconds_fields() {
            if !(value.is_finite() && (0.0..=MAX_BACKOFF_SECS).contains(&value)) {
                return Err(ConfigError::InvalidBackoff {
                    field,
                    value,
                    max: MAX_BACKOFF_SECS,
                });
            }
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            rate_limited_base_secs: 30.0,
            rate_limited_jitter_secs: 10.0,
            server_error_base_secs: 60.0,
            server_error_jitter_secs: 20.0,
            timeout_base_secs: 30.0,
            timeout_jitter_secs: 10.0,
            transport_base_secs: 30.0,
            transport_jitter_secs: 10.0,
            fast_retry_wait_ms: 100,
        }
    }
}

/// Upstream endpoints and transport timeouts (`[upstream]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub bids_base_url: String,
    pub bids_operation: String,
    pub awards_base_url: String,
    pub awards_operation: String,
    /// `inqryDiv` query parameter (1 = by announcement / opening date).
    pub inquiry_division: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            bids_base_url: "http://apis.data.go.kr/1230000/BidPublicInfoService04".to_string(),
            bids_operation: "getBidPblancListInfoServc01".to_string(),
            awards_base_url: "http://apis.data.go.kr/1230000/ScsbidInfoService04".to_string(),
            awards_operation: "getOpengInfoListServc01".to_string(),
            inquiry_division: "1".to_string(),
            connect_timeout_secs: 15,
            timeout_secs: 30,
        }
    }
}

/// Mock source settings (`[mock]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Fixed RNG seed for reproducible mock runs and jitter; random when unset.
    pub seed: Option<u64>,
}

/// Global configuration loaded from `~/.config/bidradar/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Directory for run artifacts and retry queue files.
    pub output_dir: PathBuf,
    /// `numOfRows` per upstream page.
    pub page_size: u32,
    /// Inquiry window: the last N days up to today.
    pub days_back: i64,
    /// Courtesy delay between successful pages.
    pub inter_page_delay_ms: u64,
    /// Upsert collected records into the SQLite store.
    pub persist: bool,
    pub retry: RetryConfig,
    pub upstream: UpstreamConfig,
    pub mock: MockConfig,
    pub quality: QualityThresholds,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            page_size: 100,
            days_back: 30,
            inter_page_delay_ms: 1000,
            persist: true,
            retry: RetryConfig::default(),
            upstream: UpstreamConfig::default(),
            mock: MockConfig::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl CollectorConfig {
    /// Checks values that would make every run misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        if !(0..=MAX_DAYS_BACK).contains(&self.days_back) {
            return Err(ConfigError::InvalidDaysBack {
                got: self.days_back,
                max: MAX_DAYS_BACK,
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }

    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }
}

/// API key from the environment; blank values count as missing.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bidradar")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CollectorConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<CollectorConfig> {
    if !path.exists() {
        let default_cfg = CollectorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: CollectorConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CollectorConfig::default();
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.days_back, 30);
        assert_eq!(cfg.retry.max_attempts, 6);
        assert_eq!(cfg.inter_page_delay(), Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CollectorConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CollectorConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_sections_fall_back_to_defaults() {
        let toml = r#"
            output_dir = "/var/lib/bidradar"
            inter_page_delay_ms = 0

            [retry]
            max_attempts = 3
            server_error_base_secs = 5.0

            [mock]
            seed = 42
        "#;
        let cfg: CollectorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/var/lib/bidradar"));
        assert_eq!(cfg.inter_page_delay_ms, 0);
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!((cfg.retry.server_error_base_secs - 5.0).abs() < 1e-9);
        assert!((cfg.retry.rate_limited_base_secs - 30.0).abs() < 1e-9);
        assert_eq!(cfg.mock.seed, Some(42));
        assert_eq!(cfg.upstream, UpstreamConfig::default());
    }

    #[test]
    fn zero_max_attempts_is_a_config_error() {
        let mut cfg = CollectorConfig::default();
        cfg.retry.max_attempts = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxAttempts));
    }

    #[test]
    fn infinite_or_huge_backoff_is_a_config_error() {
        for text in [
            "[retry]\nserver_error_base_secs = inf\n",
            "[retry]\nrate_limited_jitter_secs = 1e20\n",
            "[retry]\ntimeout_base_secs = nan\n",
            "[retry]\ntransport_base_secs = -1.0\n",
        ] {
            let cfg: CollectorConfig = toml::from_str(text).unwrap();
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidBackoff { .. })),
                "{text}"
            );
        }
        let cfg: CollectorConfig = toml::from_str("[retry]\nserver_error_base_secs = inf\n").unwrap();
        match cfg.validate() {
            Err(ConfigError::InvalidBackoff { field, .. }) => assert_eq!(field, "server_error_base_secs"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn days_back_must_stay_bounded() {
        let mut cfg = CollectorConfig::default();
        cfg.days_back = MAX_DAYS_BACK;
        assert!(cfg.validate().is_ok());
        for bad in [-1, MAX_DAYS_BACK + 1, i64::MAX] {
            cfg.days_back = bad;
            assert_eq!(
                cfg.validate(),
                Err(ConfigError::InvalidDaysBack {
                    got: bad,
                    max: MAX_DAYS_BACK
                })
            );
        }
    }

    #[test]
    fn load_or_init_writes_default_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_or_init_at(&path).unwrap();
        assert!(path.exists());

        fs::write(&path, "page_size = 50\n").unwrap();
        let second = load_or_init_at(&path).unwrap();
        assert_eq!(first.page_size, 100);
        assert_eq!(second.page_size, 50);
    }
}
