//! Page sink trait and types
//!
//! This module defines the interface the crawler hands fetched pages to and
//! the associated error type.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to read cached page {key}: {message}")]
    Source { key: String, message: String },
}

/// Result type for output operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A collection page ready for downstream processing
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// URL the page was requested from
    pub url: Url,

    /// Collection the page belongs to, when known
    pub collection: Option<String>,

    /// Records on the page, in order
    pub records: Vec<Value>,
}

/// Receives every collection page the crawler fetches
#[async_trait]
pub trait PageSink: Send + Sync {
    /// Handles one page, returning the number of records written
    async fn accept(&self, page: &FetchedPage) -> SinkResult<usize>;

    /// Flushes buffered output
    async fn finish(&self) -> SinkResult<()> {
        Ok(())
    }
}

/// Sink that discards every page
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl PageSink for NullSink {
    async fn accept(&self, _page: &FetchedPage) -> SinkResult<usize> {
        Ok(0)
    }
}
