//! Content-addressed HTTP cache
//!
//! This module persists request/response pairs so a crawl can be replayed
//! without touching the network:
//! - Request fingerprinting
//! - The six-part record layout
//! - Object store backends
//! - The cache store itself, with expired-session eviction

mod fingerprint;
mod object_store;
mod record;
mod store;

pub use fingerprint::fingerprint;
pub use object_store::{
    FsObjectStore, MemoryObjectStore, ObjectStore, ObjectStoreError, ObjectStoreResult,
};
pub use record::{Part, RecordMeta};
pub use store::CacheStore;

use crate::UrlError;
use thiserror::Error;

/// Errors raised by the cache store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Object store error: {0}")]
    Store(#[from] ObjectStoreError),

    #[error("Corrupt cache record at {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("Cannot fingerprint request: {0}")]
    Url(#[from] UrlError),
}
