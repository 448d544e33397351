//! Output module for fetched pages and crawl reports
//!
//! This module handles:
//! - Handing fetched collection pages to a downstream sink
//! - Writing page records as JSON lines
//! - Collecting records offline from the cache
//! - Printing crawl statistics

mod collect;
mod jsonl;
pub mod stats;
mod traits;

pub use collect::{collect, CollectReport};
pub use jsonl::JsonLinesSink;
pub use stats::{format_report, print_collect_report, print_report};
pub use traits::{FetchedPage, NullSink, PageSink, SinkError, SinkResult};
