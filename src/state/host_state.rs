use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Tracks the state of one host during crawling
///
/// The semaphore caps simultaneous in-flight requests to the host; the counters
/// are informational and feed debug logging.
#[derive(Debug, Clone)]
pub struct HostState {
    /// Permits for in-flight requests to this host
    pub semaphore: Arc<Semaphore>,

    /// Number of fetch attempts made to this host in the current crawl
    pub request_count: u64,

    /// When the last attempt to this host started
    pub last_request_time: Option<Instant>,

    limit: usize,
}

impl HostState {
    /// Creates a new HostState allowing `limit` simultaneous requests
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            request_count: 0,
            last_request_time: None,
            limit,
        }
    }

    /// Records that an attempt to this host is starting
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Number of requests to this host currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
