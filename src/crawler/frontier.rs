//! The crawl frontier: pending requests plus the seen-set
//!
//! This module handles:
//! - Deduplicating requests by normalized identity
//! - Handing out pending requests under a pluggable ordering policy
//!   (LIFO by default, FIFO and priority built in)

use crate::config::FrontierOrdering;
use crate::crawler::request::RequestSpec;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

/// Storage and ordering policy for pending requests
///
/// Implement this to plug a custom ordering into a [`Frontier`]. The frontier
/// takes care of deduplication; a queue only decides what comes out next.
pub trait PendingQueue: Send {
    fn push(&mut self, request: RequestSpec);

    fn pop(&mut self) -> Option<RequestSpec>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last scheduled, first fetched (depth-first)
#[derive(Debug, Default)]
pub struct LifoQueue {
    stack: Vec<RequestSpec>,
}

impl PendingQueue for LifoQueue {
    fn push(&mut self, request: RequestSpec) {
        self.stack.push(request);
    }

    fn pop(&mut self) -> Option<RequestSpec> {
        self.stack.pop()
    }

    fn len(&self) -> usize {
        self.stack.len()
    }
}

/// First scheduled, first fetched (breadth-first)
#[derive(Debug, Default)]
pub struct FifoQueue {
    queue: VecDeque<RequestSpec>,
}

impl PendingQueue for FifoQueue {
    fn push(&mut self, request: RequestSpec) {
        self.queue.push_back(request);
    }

    fn pop(&mut self) -> Option<RequestSpec> {
        self.queue.pop_front()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A pending request keyed for the priority heap
#[derive(Debug)]
struct Prioritized {
    priority: i32,
    sequence: u64,
    request: RequestSpec,
}

// BinaryHeap is a max-heap: reverse both keys so the lowest priority value,
// then the earliest scheduled, pops first
impl Ord for Prioritized {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Prioritized {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Prioritized {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for Prioritized {}

/// Lowest priority value first; ties in scheduling order
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<Prioritized>,
    sequence: u64,
}

impl PendingQueue for PriorityQueue {
    fn push(&mut self, request: RequestSpec) {
        self.sequence += 1;
        self.heap.push(Prioritized {
            priority: request.priority(),
            sequence: self.sequence,
            request,
        });
    }

    fn pop(&mut self) -> Option<RequestSpec> {
        self.heap.pop().map(|entry| entry.request)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Pending requests plus every identity ever scheduled in this run
///
/// An identity is enqueued at most once per frontier unless the request was
/// built with [`RequestSpec::allow_revisit`]. Scheduling a duplicate is a
/// silent no-op.
pub struct Frontier {
    pending: Box<dyn PendingQueue>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier with a built-in ordering
    pub fn new(ordering: FrontierOrdering) -> Self {
        let pending: Box<dyn PendingQueue> = match ordering {
            FrontierOrdering::Lifo => Box::new(LifoQueue::default()),
            FrontierOrdering::Fifo => Box::new(FifoQueue::default()),
            FrontierOrdering::Priority => Box::new(PriorityQueue::default()),
        };
        Self::with_queue(pending)
    }

    /// Creates an empty frontier over a caller-supplied queue
    pub fn with_queue(pending: Box<dyn PendingQueue>) -> Self {
        Self {
            pending,
            seen: HashSet::new(),
        }
    }

    /// Schedules a request unless its identity has been seen
    ///
    /// # Returns
    ///
    /// * `true` - The request was enqueued
    /// * `false` - It was a duplicate and was dropped
    pub fn schedule(&mut self, request: RequestSpec) -> bool {
        let first_sighting = self.seen.insert(request.identity().to_string());
        if !first_sighting && !request.revisit_allowed() {
            tracing::trace!("Duplicate request ignored: {}", request);
            return false;
        }

        self.pending.push(request);
        true
    }

    /// Removes and returns the next pending request
    pub fn next(&mut self) -> Option<RequestSpec> {
        self.pending.pop()
    }

    /// Returns true if no requests are pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct identities scheduled so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if the identity has ever been scheduled
    pub fn has_seen(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("pending", &self.pending.len())
            .field("seen", &self.seen.len())
            .finish()
    }
}
