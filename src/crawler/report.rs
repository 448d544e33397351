use crate::state::CrawlPhase;

/// Outcome of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Phase the controller finished in
    pub phase: CrawlPhase,

    /// Requests that produced a usable response
    pub completed: usize,

    /// Requests given up on
    pub abandoned: usize,

    /// Requests re-issued after an expired session
    pub retried: usize,

    /// Logins performed after the first one
    pub reauthenticated: usize,

    /// Responses served from the cache
    pub cache_hits: usize,

    /// Requests still outstanding when the crawl timeout fired
    pub cancelled: usize,

    /// Records handed to the page sink
    pub records: usize,

    /// Collections left out by the allow-list
    pub skipped_collections: Vec<String>,

    /// URLs of abandoned requests
    pub failed_urls: Vec<String>,

    /// Frontier entries left for the next run
    pub pending: usize,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self {
            phase: CrawlPhase::Start,
            completed: 0,
            abandoned: 0,
            retried: 0,
            reauthenticated: 0,
            cache_hits: 0,
            cancelled: 0,
            records: 0,
            skipped_collections: Vec::new(),
            failed_urls: Vec::new(),
            pending: 0,
        }
    }

    /// True when nothing was abandoned or cancelled
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0 && self.cancelled == 0
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}
