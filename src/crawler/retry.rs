//! Retry policy for transient fetch failures
//!
//! Delays grow exponentially from `backoff-base`, are capped at `backoff-cap`,
//! and are jittered so that many requests failing together do not retry in
//! lockstep.

use crate::config::CrawlerConfig;
use rand::Rng;
use std::time::Duration;

/// Retry policy for transient fetch failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first one
    pub max_retries: u32,

    /// Delay before the first retry
    pub base: Duration,

    /// Ceiling for the exponential delay
    pub cap: Duration,

    /// Whether to randomize the delay
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: config.backoff_base(),
            cap: config.backoff_cap(),
            jitter: true,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base: Duration::ZERO,
            cap: Duration::ZERO,
            jitter: false,
        }
    }

    /// Returns true if a request that has already been retried `retries_done`
    /// times may be attempted again
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Upper bound for the delay before retry number `retry` (1-based)
    ///
    /// `base * 2^(retry - 1)`, capped.
    pub fn ceiling(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    /// Delay before retry number `retry` (1-based)
    ///
    /// With jitter the delay is drawn uniformly from `[ceiling / 2, ceiling]`.
    pub fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }

        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
