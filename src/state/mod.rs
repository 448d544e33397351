//! State module for tracking crawl progress
//!
//! - `CrawlPhase`: the controller's state machine phases
//! - `PhaseTracker`: phase bookkeeping that tolerates concurrent retries

mod crawl_phase;

pub use crawl_phase::{CrawlPhase, PhaseTracker};
