use std::collections::BTreeMap;

/// Session cookies scoped to a single cookie domain
///
/// A cookie set is what an authentication run produces and what every crawl
/// request carries. It lives only in memory and is replaced wholesale when the
/// session is refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    domain: String,
    cookies: BTreeMap<String, String>,
}

impl CookieSet {
    /// Creates an empty cookie set for `domain`
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            cookies: BTreeMap::new(),
        }
    }

    /// The cookie domain every cookie in this set belongs to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Inserts or replaces a cookie
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the set as a `Cookie` request header value
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
