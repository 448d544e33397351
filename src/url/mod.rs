//! URL handling for odata-harvest
//!
//! This module provides request canonicalization for cache fingerprints,
//! cache path derivation, cookie-domain computation, and the allowed-domain
//! scope that keeps pagination links on the target service.

mod domain;
mod matcher;
mod normalize;

pub use domain::{cookie_domain, domain_matches, extract_domain, same_cookie_domain};
pub use matcher::matches_wildcard;
pub use normalize::{cache_path, canonicalize_url};

use url::Url;

/// The set of domains the crawler is allowed to request
///
/// Pagination links pointing anywhere else are dropped.
#[derive(Debug, Clone)]
pub struct Scope {
    patterns: Vec<String>,
}

impl Scope {
    /// Creates a scope from domain patterns (exact or `*.` wildcards)
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the URL's host is inside the scope
    pub fn allows(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(domain) => self
                .patterns
                .iter()
                .any(|pattern| matches_wildcard(pattern, &domain)),
            None => false,
        }
    }

    /// Returns the configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
