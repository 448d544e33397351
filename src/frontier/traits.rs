//! Set store trait and error types

use thiserror::Error;

/// Errors that can occur during frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// A store of named string sets
///
/// Implementations must be safe to share between crawl tasks.
pub trait SetStore: Send + Sync {
    /// Adds a member; returns true if it was not already present
    fn set_add(&self, set: &str, member: &str) -> FrontierResult<bool>;

    /// Removes a member; returns true if it was present
    fn set_remove(&self, set: &str, member: &str) -> FrontierResult<bool>;

    /// Returns up to `count` members after `cursor`
    ///
    /// Scanning starts with cursor 0 and is complete when the returned cursor
    /// is 0. Members added or removed during a scan may or may not be seen.
    fn set_scan(&self, set: &str, cursor: u64, count: usize) -> FrontierResult<(u64, Vec<String>)>;
}
