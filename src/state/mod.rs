//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunState`: lifecycle of a crawl run (idle, running, finished)
//! - `HostState`: per-host politeness permits and request counters

mod host_state;
mod run_state;

pub use host_state::HostState;
pub use run_state::RunState;
