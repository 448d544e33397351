//! Offline record collection
//!
//! Walks the cache and feeds every cached collection page to a sink without
//! touching the network. Service root documents are skipped, as are records
//! that did not capture a successful response.

use crate::cache::{ObjectStore, Part, RecordMeta};
use crate::crawler::odata::{collection_from_url, excerpt, parse_page};
use crate::output::traits::{FetchedPage, PageSink, SinkError, SinkResult};
use serde_json::Value;
use url::Url;

/// Counts gathered by a collect pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Cached response bodies found
    pub documents: usize,

    /// Service root documents skipped
    pub service_roots: usize,

    /// Pages handed to the sink
    pub pages: usize,

    /// Records written by the sink
    pub records: usize,

    /// Documents that were incomplete, unsuccessful or unparseable
    pub skipped: usize,
}

/// Feeds every cached collection page under `prefix` to `sink`
///
/// # Arguments
///
/// * `store` - The object store backing the cache
/// * `prefix` - The cache key prefix
/// * `sink` - Destination for page records
///
/// # Returns
///
/// * `Ok(CollectReport)` - Pass completed
/// * `Err(SinkError)` - The store could not be listed or the sink failed
pub async fn collect(
    store: &dyn ObjectStore,
    prefix: &str,
    sink: &dyn PageSink,
) -> SinkResult<CollectReport> {
    let prefix = format!("{}/", prefix.trim_matches('/'));
    let suffix = format!("/{}", Part::ResponseBody.as_str());

    let keys = store.list(&prefix).await.map_err(|e| SinkError::Source {
        key: prefix.clone(),
        message: e.to_string(),
    })?;

    let mut report = CollectReport::default();

    for body_key in keys.iter().filter(|k| k.ends_with(&suffix)) {
        report.documents += 1;
        let record_prefix = &body_key[..body_key.len() - suffix.len()];

        let meta_key = format!("{}/{}", record_prefix, Part::PickledMeta.as_str());
        let meta = match store.read(&meta_key).await {
            Ok(bytes) => match RecordMeta::from_json(&meta_key, &bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(key = %meta_key, error = %e, "Skipping corrupt cache record");
                    report.skipped += 1;
                    continue;
                }
            },
            Err(e) => {
                tracing::debug!(key = %meta_key, error = %e, "Skipping incomplete cache record");
                report.skipped += 1;
                continue;
            }
        };

        if !(200..300).contains(&meta.status) {
            report.skipped += 1;
            continue;
        }

        let body = store.read(body_key).await.map_err(|e| SinkError::Source {
            key: body_key.clone(),
            message: e.to_string(),
        })?;

        if is_service_root(&body) {
            report.service_roots += 1;
            continue;
        }

        let url = match Url::parse(&meta.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(key = %meta_key, error = %e, "Skipping record with invalid URL");
                report.skipped += 1;
                continue;
            }
        };

        let page = match parse_page(&body, &url) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    body = %excerpt(&body),
                    "Skipping malformed cached page"
                );
                report.skipped += 1;
                continue;
            }
        };

        let fetched = FetchedPage {
            collection: collection_from_url(&url),
            url,
            records: page.records,
        };
        report.records += sink.accept(&fetched).await?;
        report.pages += 1;
    }

    sink.finish().await?;

    tracing::info!(
        documents = report.documents,
        pages = report.pages,
        records = report.records,
        skipped = report.skipped,
        "Collect pass finished"
    );
    Ok(report)
}

/// True for v2 (`d.EntitySets`) and v4 (`$metadata` context) service documents
fn is_service_root(body: &[u8]) -> bool {
    let Ok(document) = serde_json::from_slice::<Value>(body) else {
        return false;
    };
    if document.pointer("/d/EntitySets").is_some() {
        return true;
    }
    document
        .get("@odata.context")
        .and_then(Value::as_str)
        .map(|context| context.ends_with("$metadata"))
        .unwrap_or(false)
}
