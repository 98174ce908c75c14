//! Suspend points for backoff and inter-page delays.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Something that can suspend the calling run for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waiting on the tokio timer; only the calling task is suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fast-retry mode: every wait is replaced by a short fixed pause.
#[derive(Debug, Clone, Copy)]
pub struct FastSleeper {
    pub wait: Duration,
}

impl Default for FastSleeper {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl Sleeper for FastSleeper {
    async fn sleep(&self, requested: Duration) {
        tracing::trace!(?requested, actual = ?self.wait, "fast retry wait");
        tokio::time::sleep(self.wait).await;
    }
}

/// Records requested waits without waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.waits.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut w) = self.waits.lock() {
            w.push(duration);
        }
    }
}
