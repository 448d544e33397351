//! Durable crawl frontier
//!
//! This module tracks pagination URLs that have been discovered but not yet
//! fetched successfully, including:
//! - The set store abstraction and its SQLite and in-memory backends
//! - Schema management for the SQLite backend
//! - The `Frontier` facade used by the crawl controller
//!
//! The frontier is the only thing that makes a crawl resumable: every member
//! still present at startup is fetched again.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemorySetStore;
pub use sqlite::SqliteSetStore;
pub use traits::{FrontierError, FrontierResult, SetStore};

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

/// Members fetched per scan call
const SCAN_BATCH: usize = 100;

/// Set name used when none is configured
pub const DEFAULT_SET_NAME: &str = "frontier";

/// The set of pending pagination URLs
#[derive(Clone)]
pub struct Frontier {
    store: Arc<dyn SetStore>,
    set: String,
}

impl Frontier {
    pub fn new(store: Arc<dyn SetStore>, set: impl Into<String>) -> Self {
        Self {
            store,
            set: set.into(),
        }
    }

    /// A frontier that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySetStore::new()), DEFAULT_SET_NAME)
    }

    /// Opens a durable frontier, or an in-memory one when `path` is `None`
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to the SQLite database file
    /// * `set` - Name of the set holding pending URLs
    ///
    /// # Returns
    ///
    /// * `Ok(Frontier)` - Successfully opened frontier
    /// * `Err(FrontierError)` - Failed to open the database
    pub fn open(path: Option<&Path>, set: &str) -> FrontierResult<Self> {
        match path {
            Some(path) => Ok(Self::new(Arc::new(SqliteSetStore::new(path)?), set)),
            None => {
                tracing::warn!("No frontier database configured; this crawl will not be resumable");
                Ok(Self::new(Arc::new(MemorySetStore::new()), set))
            }
        }
    }

    pub fn set_name(&self) -> &str {
        &self.set
    }

    /// Records a URL as pending; returns true if it was not already pending
    pub fn add(&self, url: &str) -> FrontierResult<bool> {
        self.store.set_add(&self.set, url)
    }

    /// Marks a URL as done; returns true if it was pending
    pub fn remove(&self, url: &str) -> FrontierResult<bool> {
        self.store.set_remove(&self.set, url)
    }

    /// Lazily enumerates pending URLs in no particular order
    ///
    /// Each call starts a fresh scan.
    pub fn pending(&self) -> Pending<'_> {
        Pending {
            frontier: self,
            cursor: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Counts pending URLs
    pub fn len(&self) -> FrontierResult<usize> {
        let mut count = 0;
        for url in self.pending() {
            url?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> FrontierResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every pending URL, returning how many were removed
    pub fn clear(&self) -> FrontierResult<usize> {
        let urls = self.pending().collect::<FrontierResult<Vec<_>>>()?;
        for url in &urls {
            self.remove(url)?;
        }
        Ok(urls.len())
    }
}

/// Iterator over pending frontier URLs
pub struct Pending<'a> {
    frontier: &'a Frontier,
    cursor: u64,
    buffer: VecDeque<String>,
    exhausted: bool,
}

impl Iterator for Pending<'_> {
    type Item = FrontierResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(url) = self.buffer.pop_front() {
                return Some(Ok(url));
            }
            if self.exhausted {
                return None;
            }

            match self
                .frontier
                .store
                .set_scan(&self.frontier.set, self.cursor, SCAN_BATCH)
            {
                Ok((next, members)) => {
                    self.buffer.extend(members);
                    self.cursor = next;
                    self.exhausted = next == 0;
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
