//! On-disk layout of a cached exchange
//!
//! A record is six parts stored side by side under the request's
//! fingerprint. `pickled_meta` is the part the cache decodes; `meta` is the
//! same information laid out for people reading the store directly.

use crate::cache::CacheError;
use crate::transport::{HttpRequest, HttpResponse};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The named parts of a cache record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Meta,
    PickledMeta,
    RequestHeaders,
    RequestBody,
    ResponseHeaders,
    ResponseBody,
}

impl Part {
    /// Every part, in write order
    pub const ALL: [Part; 6] = [
        Part::Meta,
        Part::PickledMeta,
        Part::RequestHeaders,
        Part::RequestBody,
        Part::ResponseHeaders,
        Part::ResponseBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::PickledMeta => "pickled_meta",
            Self::RequestHeaders => "request_headers",
            Self::RequestBody => "request_body",
            Self::ResponseHeaders => "response_headers",
            Self::ResponseBody => "response_body",
        }
    }
}

/// Machine-readable summary of an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// URL the request was sent to
    pub url: String,
    pub method: String,
    pub status: u16,
    /// URL the response was served from
    pub response_url: String,
    /// Capture time in seconds since the Unix epoch
    pub timestamp: f64,
}

impl RecordMeta {
    pub fn new(request: &HttpRequest, response: &HttpResponse, captured_at: DateTime<Utc>) -> Self {
        Self {
            url: request.url.to_string(),
            method: request.method.as_str().to_string(),
            status: response.status,
            response_url: response.url.to_string(),
            timestamp: captured_at.timestamp_millis() as f64 / 1000.0,
        }
    }

    /// Capture time, if the stored timestamp is representable
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        let millis = (self.timestamp * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(self).map_err(|e| CacheError::Corrupt {
            key: Part::PickledMeta.as_str().to_string(),
            message: e.to_string(),
        })
    }

    /// Decodes a `pickled_meta` part read from `key`
    pub fn from_json(key: &str, bytes: &[u8]) -> Result<Self, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Renders the `meta` part
    pub fn summary(&self) -> String {
        let captured = self
            .captured_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string());
        format!(
            "url: {}\nmethod: {}\nstatus: {}\nresponse_url: {}\ntimestamp: {}\n",
            self.url, self.method, self.status, self.response_url, captured
        )
    }
}
