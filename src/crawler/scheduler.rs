//! Request pacing and retry timing
//!
//! This module handles:
//! - Spacing request starts by a minimum interval across all tasks
//! - Exponential backoff delays between retries of transient failures

use crate::config::CrawlerConfig;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive request starts
///
/// The pacer is shared by every task issuing requests, so the interval holds
/// for the whole run regardless of how many product fetches are in flight.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Waits until a request may start, then records the start time
    pub async fn wait_turn(&self) {
        // Holding the lock while sleeping queues callers in arrival order
        let mut last = self.last_start.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!("Pacing request for {:?}", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Exponential backoff with optional proportional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.retry_base_delay_ms, config.retry_max_delay_ms)
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        let capped = exponential.min(self.max_ms);
        let jitter = if self.jitter_percent > 0 && capped > 0 {
            rand::thread_rng().gen_range(0..=capped * self.jitter_percent / 100)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}
