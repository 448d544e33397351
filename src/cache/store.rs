use crate::cache::fingerprint::fingerprint;
use crate::cache::object_store::{ObjectStore, ObjectStoreError};
use crate::cache::record::{Part, RecordMeta};
use crate::cache::CacheError;
use crate::transport::{
    headers_from_raw, headers_to_raw, ExpiryPolicy, HttpRequest, HttpResponse, StatusExpiry,
};
use crate::url::cache_path;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// Content-addressed cache of HTTP exchanges
///
/// Records live at `<prefix>/<url path>/<fingerprint>/<part>`. The store
/// never serves a response that signals an expired session: such responses
/// are not written, and stale ones found on read are evicted.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    expiry: Arc<dyn ExpiryPolicy>,
}

impl CacheStore {
    /// Creates a cache treating every redirect as an expired session
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            expiry: Arc::new(StatusExpiry::any_redirect()),
        }
    }

    /// Replaces the expiry predicate
    pub fn with_expiry(mut self, expiry: Arc<dyn ExpiryPolicy>) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Path under which every part of the request's record is stored
    pub fn key_prefix(&self, request: &HttpRequest) -> Result<String, CacheError> {
        let fingerprint = fingerprint(request)?;
        let path = cache_path(&request.url);

        let segments: Vec<&str> = [self.prefix.as_str(), path.as_str(), fingerprint.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        Ok(segments.join("/"))
    }

    fn part_key(key_prefix: &str, part: Part) -> String {
        format!("{}/{}", key_prefix, part.as_str())
    }

    /// Looks up the cached response for a request
    ///
    /// # Returns
    ///
    /// * `Ok(Some(response))` - All six parts are present and the stored
    ///   response is not an expired-session redirect
    /// * `Ok(None)` - Miss: a part is missing, or a stale redirect was evicted
    /// * `Err(CacheError)` - The record is corrupt or the store failed
    pub async fn get(&self, request: &HttpRequest) -> Result<Option<HttpResponse>, CacheError> {
        let key_prefix = self.key_prefix(request)?;

        let meta_key = Self::part_key(&key_prefix, Part::PickledMeta);
        let meta_bytes = match self.read_part(&meta_key).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let meta = RecordMeta::from_json(&meta_key, &meta_bytes)?;
        let response_url = Url::parse(&meta.response_url).map_err(|e| CacheError::Corrupt {
            key: meta_key.clone(),
            message: format!("response_url: {}", e),
        })?;

        let probe = HttpResponse::new(meta.status, response_url.clone());
        if self.expiry.is_expired(&probe) {
            tracing::info!(
                url = %request.url,
                status = meta.status,
                "Evicting cached expired-session redirect"
            );
            self.evict(&key_prefix).await;
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(Part::ALL.len());
        for part in Part::ALL {
            if part == Part::PickledMeta {
                continue;
            }
            match self.read_part(&Self::part_key(&key_prefix, part)).await? {
                Some(bytes) => parts.push((part, bytes)),
                None => {
                    tracing::debug!(url = %request.url, part = part.as_str(), "Incomplete cache record");
                    return Ok(None);
                }
            }
        }

        let mut response = HttpResponse::new(meta.status, response_url);
        for (part, bytes) in parts {
            match part {
                Part::ResponseHeaders => response.headers = headers_from_raw(&bytes),
                Part::ResponseBody => response.body = bytes,
                _ => {}
            }
        }

        tracing::debug!(url = %request.url, status = response.status, "Cache hit");
        Ok(Some(response))
    }

    /// Stores an exchange
    ///
    /// Expired-session redirects are never written.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - All six parts were written
    /// * `Ok(false)` - The response was not cacheable
    /// * `Err(CacheError)` - A write failed; the partial record reads as a miss
    pub async fn put(&self, request: &HttpRequest, response: &HttpResponse) -> Result<bool, CacheError> {
        if self.expiry.is_expired(response) {
            tracing::debug!(url = %request.url, status = response.status, "Not caching expired-session redirect");
            return Ok(false);
        }

        let key_prefix = self.key_prefix(request)?;
        let meta = RecordMeta::new(request, response, Utc::now());

        let contents: [(Part, Vec<u8>); 6] = [
            (Part::Meta, meta.summary().into_bytes()),
            (Part::PickledMeta, meta.to_json()?),
            (Part::RequestHeaders, headers_to_raw(&request.headers)),
            (Part::RequestBody, request.body.clone()),
            (Part::ResponseHeaders, headers_to_raw(&response.headers)),
            (Part::ResponseBody, response.body.clone()),
        ];

        for (part, bytes) in &contents {
            self.store
                .write(&Self::part_key(&key_prefix, *part), bytes)
                .await?;
        }

        tracing::debug!(url = %request.url, key = %key_prefix, "Cached response");
        Ok(true)
    }

    async fn read_part(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.store.read(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(ObjectStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn evict(&self, key_prefix: &str) {
        let keys: Vec<String> = Part::ALL
            .iter()
            .map(|part| Self::part_key(key_prefix, *part))
            .collect();
        if let Err(e) = self.store.delete_many(&keys).await {
            tracing::warn!(key = %key_prefix, error = %e, "Failed to evict cache record");
        }
    }
}
