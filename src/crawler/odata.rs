//! OData payload parsing
//!
//! This module understands just enough of the OData JSON formats to crawl:
//! - Service roots: the v2 `d.EntitySets` name list and the v4 `value` list
//! - Collection pages: records and the next-page link
//!
//! Anything else is a malformed payload.

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors raised for payloads the crawler cannot interpret
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid link '{link}': {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },
}

/// An entity collection advertised by a service root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    /// First page of the collection
    pub url: Url,
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    /// Absolute URL of the next page, if there is one
    pub next_link: Option<Url>,
}

/// Parses a service root document into its collections
///
/// # Arguments
///
/// * `body` - The raw response body
/// * `root_url` - URL the document was fetched from; collection URLs are
///   resolved against it
///
/// # Returns
///
/// * `Ok(Vec<Collection>)` - Collections in advertised order
/// * `Err(PayloadError)` - The body is not a service root document
pub fn parse_service_root(body: &[u8], root_url: &Url) -> Result<Vec<Collection>, PayloadError> {
    let document: Value = serde_json::from_slice(body)?;
    let base = with_trailing_slash(root_url);

    if let Some(sets) = document.pointer("/d/EntitySets") {
        let names = sets
            .as_array()
            .ok_or_else(|| shape("d.EntitySets is not an array"))?;
        return names
            .iter()
            .map(|name| {
                let name = name
                    .as_str()
                    .ok_or_else(|| shape("d.EntitySets entry is not a string"))?;
                Ok(Collection {
                    name: name.to_string(),
                    url: join(&base, name)?,
                })
            })
            .collect();
    }

    if let Some(entries) = document.get("value").and_then(Value::as_array) {
        return entries
            .iter()
            .map(|entry| {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape("service document entry without a name"))?;
                let link = entry.get("url").and_then(Value::as_str).unwrap_or(name);
                Ok(Collection {
                    name: name.to_string(),
                    url: join(&base, link)?,
                })
            })
            .collect();
    }

    Err(shape("neither d.EntitySets nor value found"))
}

/// Parses a collection page
///
/// Records come from `d.results` (or a bare `d` array) or `value`; the next
/// link from `d.__next`, `@odata.nextLink` or `odata.nextLink`.
pub fn parse_page(body: &[u8], page_url: &Url) -> Result<Page, PayloadError> {
    let document: Value = serde_json::from_slice(body)?;

    let (records, next) = if let Some(d) = document.get("d") {
        if let Some(results) = d.as_array() {
            (results.clone(), None)
        } else {
            let results = d
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| shape("d.results missing or not an array"))?;
            (results.clone(), d.get("__next"))
        }
    } else if let Some(values) = document.get("value").and_then(Value::as_array) {
        let next = document
            .get("@odata.nextLink")
            .or_else(|| document.get("odata.nextLink"));
        (values.clone(), next)
    } else {
        return Err(shape("neither d nor value found"));
    };

    let next_link = match next {
        None | Some(Value::Null) => None,
        Some(Value::String(link)) => Some(join(page_url, link)?),
        Some(_) => return Err(shape("next link is not a string")),
    };

    Ok(Page { records, next_link })
}

/// Guesses the collection a page URL belongs to
///
/// `.../OrganizationData.svc/AccountSet?$skiptoken=...` yields `AccountSet`.
pub fn collection_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let name = segment.split('(').next().unwrap_or(segment);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// A short, single-line excerpt of a body for log messages
pub fn excerpt(body: &[u8]) -> String {
    const LIMIT: usize = 200;
    let text = String::from_utf8_lossy(body);
    let mut excerpt: String = text.chars().take(LIMIT).collect();
    if text.chars().count() > LIMIT {
        excerpt.push_str("...");
    }
    excerpt.replace(['\r', '\n'], " ")
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut base = url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn join(base: &Url, link: &str) -> Result<Url, PayloadError> {
    base.join(link).map_err(|source| PayloadError::InvalidLink {
        link: link.to_string(),
        source,
    })
}

fn shape(message: &str) -> PayloadError {
    PayloadError::UnexpectedShape(message.to_string())
}
