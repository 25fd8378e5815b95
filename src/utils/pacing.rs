// src/utils/pacing.rs

//! Sleep capability and randomized delay ranges.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Something that can wait.
///
/// Retry backoff and human pacing go through this so tests never wait for real.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Inclusive delay bounds in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields the same delay.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draw a delay uniformly from the range.
    pub fn pick(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        if lo == hi {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    pub fn contains(&self, duration: Duration) -> bool {
        let ms = duration.as_millis() as u64;
        ms >= self.min_ms.min(self.max_ms) && ms <= self.max_ms.max(self.min_ms)
    }
}
