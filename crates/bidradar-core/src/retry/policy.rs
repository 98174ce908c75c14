use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{RetryConfig, MAX_BACKOFF_SECS};

/// Which kind of transport failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Timeout,
    Generic,
}

/// High-level classification of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Bad request, auth failure, or an unknown status. Never retried.
    Terminal,
    /// Server asked us to slow down (429).
    RateLimited,
    /// Any 5xx.
    ServerError,
    /// No complete response (timeout or other transport error).
    Transport(TransportKind),
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureClass::Terminal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::Terminal => "terminal",
            FailureClass::RateLimited => "rate_limited",
            FailureClass::ServerError => "server_error",
            FailureClass::Transport(TransportKind::Timeout) => "timeout",
            FailureClass::Transport(TransportKind::Generic) => "transport",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// One backoff formula: `base * (attempt + 1) + U(0, max_jitter)`, or
/// `base + U(0, max_jitter)` when `scale_with_attempt` is false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub max_jitter: Duration,
    pub scale_with_attempt: bool,
}

impl Backoff {
    pub const fn scaled(base_secs: u64, jitter_secs: u64) -> Self {
        Self {
            base: Duration::from_secs(base_secs),
            max_jitter: Duration::from_secs(jitter_secs),
            scale_with_attempt: true,
        }
    }

    pub const fn flat(base_secs: u64, jitter_secs: u64) -> Self {
        Self {
            base: Duration::from_secs(base_secs),
            max_jitter: Duration::from_secs(jitter_secs),
            scale_with_attempt: false,
        }
    }

    /// Out-of-range seconds are clamped; `CollectorConfig::validate` rejects them first.
    fn from_secs(base: f64, jitter: f64, scale_with_attempt: bool) -> Self {
        Self {
            base: clamped_secs(base),
            max_jitter: clamped_secs(jitter),
            scale_with_attempt,
        }
    }

    /// Delay for a 0-based attempt index. Draws one uniform sample from `rng`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt_index: u32, rng: &mut R) -> Duration {
        let factor = if self.scale_with_attempt {
            attempt_index.saturating_add(1)
        } else {
            1
        };
        let fixed = self.base.saturating_mul(factor);
        let jitter = self.max_jitter.mul_f64(rng.gen::<f64>());
        fixed.saturating_add(jitter)
    }
}

fn clamped_secs(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_BACKOFF_SECS))
}

/// Per-class backoff with a shared attempt cap.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub rate_limited: Backoff,
    pub server_error: Backoff,
    pub timeout: Backoff,
    pub transport: Backoff,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            rate_limited: Backoff::scaled(30, 10),
            server_error: Backoff::scaled(60, 20),
            timeout: Backoff::scaled(30, 10),
            transport: Backoff::flat(30, 10),
        }
    }
}

impl BackoffPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            rate_limited: Backoff::from_secs(
                cfg.rate_limited_base_secs,
                cfg.rate_limited_jitter_secs,
                true,
            ),
            server_error: Backoff::from_secs(
                cfg.server_error_base_secs,
                cfg.server_error_jitter_secs,
                true,
            ),
            timeout: Backoff::from_secs(cfg.timeout_base_secs, cfg.timeout_jitter_secs, true),
            transport: Backoff::from_secs(
                cfg.transport_base_secs,
                cfg.transport_jitter_secs,
                false,
            ),
        }
    }

    /// Formula used for a class; `None` for terminal failures.
    pub fn backoff_for(&self, class: FailureClass) -> Option<&Backoff> {
        match class {
            FailureClass::Terminal => None,
            FailureClass::RateLimited => Some(&self.rate_limited),
            FailureClass::ServerError => Some(&self.server_error),
            FailureClass::Transport(TransportKind::Timeout) => Some(&self.timeout),
            FailureClass::Transport(TransportKind::Generic) => Some(&self.transport),
        }
    }

    /// Wait before the attempt after `attempt_index` (0-based). `None` for terminal failures.
    pub fn wait<R: Rng + ?Sized>(
        &self,
        class: FailureClass,
        attempt_index: u32,
        rng: &mut R,
    ) -> Option<Duration> {
        self.backoff_for(class)
            .map(|b| b.delay(attempt_index, rng))
    }

    /// Retry decision after a failed attempt. The final attempt never waits.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        attempt_index: u32,
        class: FailureClass,
        rng: &mut R,
    ) -> RetryDecision {
        if attempt_index.saturating_add(1) >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match self.wait(class, attempt_index, rng) {
            Some(d) => RetryDecision::RetryAfter(d),
            None => RetryDecision::NoRetry,
        }
    }
}
