//! Per-host concurrency limits
//!
//! The global worker cap bounds how many requests are in flight overall; this
//! module additionally bounds how many of those may target the same host.

use crate::state::HostState;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;

/// Hands out per-host permits, creating host state on first use
#[derive(Debug)]
pub struct HostLimiter {
    per_host: usize,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl HostLimiter {
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for a free slot on `host`
    ///
    /// The permit is released when dropped.
    pub async fn acquire(&self, host: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = {
            let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
            let state = hosts
                .entry(host.to_string())
                .or_insert_with(|| HostState::new(self.per_host));
            state.record_request(Instant::now());
            state.semaphore.clone()
        };

        // The semaphore is never closed, so this only fails if that changes
        semaphore.acquire_owned().await.ok()
    }

    /// Takes a free slot on `host` without waiting
    ///
    /// Returns `None` when the host is already at its limit.
    pub fn try_acquire(&self, host: &str) -> Option<OwnedSemaphorePermit> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(self.per_host));
        let permit = state.semaphore.clone().try_acquire_owned().ok()?;
        state.record_request(Instant::now());
        Some(permit)
    }

    /// Attempts made to `host` so far
    pub fn request_count(&self, host: &str) -> u64 {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts.get(host).map_or(0, |state| state.request_count)
    }

    /// Requests to `host` currently holding a permit
    pub fn in_flight(&self, host: &str) -> usize {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts.get(host).map_or(0, HostState::in_flight)
    }

    /// Number of distinct hosts seen
    pub fn host_count(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_counts_requests() {
        let limiter = HostLimiter::new(2);

        let permit = limiter.acquire("example.com").await;
        assert!(permit.is_some());
        assert_eq!(limiter.request_count("example.com"), 1);
        assert_eq!(limiter.in_flight("example.com"), 1);

        drop(permit);
        assert_eq!(limiter.in_flight("example.com"), 0);
        assert_eq!(limiter.request_count("other.com"), 0);
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let limiter = HostLimiter::new(1);

        let _a = limiter.acquire("a.com").await;
        let b = tokio::time::timeout(Duration::from_millis(100), limiter.acquire("b.com")).await;

        assert!(b.is_ok());
        assert_eq!(limiter.host_count(), 2);
    }

    #[tokio::test]
    async fn test_cap_blocks_until_release() {
        let limiter = HostLimiter::new(1);

        let first = limiter.acquire("a.com").await;
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("a.com")).await;
        assert!(blocked.is_err());

        drop(first);
        let second =
            tokio::time::timeout(Duration::from_millis(100), limiter.acquire("a.com")).await;
        assert!(matches!(second, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_try_acquire_does_not_wait() {
        let limiter = HostLimiter::new(1);

        let first = limiter.try_acquire("a.com");
        assert!(first.is_some());
        assert!(limiter.try_acquire("a.com").is_none());
        assert!(limiter.try_acquire("b.com").is_some());
        assert_eq!(limiter.request_count("a.com"), 1);

        drop(first);
        assert!(limiter.try_acquire("a.com").is_some());
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let limiter = HostLimiter::new(0);
        assert_eq!(limiter.per_host, 1);
    }
}
