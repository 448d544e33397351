use url::Url;

/// Why a URL is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A configured service root
    Seed,
    /// A page left in the frontier by an earlier run
    Resumed,
    /// A collection's first page or a next link found during this run
    Discovered,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Resumed => "resumed",
            Self::Discovered => "discovered",
        }
    }
}

/// A single fetch scheduled by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    pub origin: Origin,
    /// Collection the page belongs to, when known
    pub collection: Option<String>,
}

impl CrawlRequest {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            origin: Origin::Seed,
            collection: None,
        }
    }

    pub fn resumed(url: Url) -> Self {
        Self {
            url,
            origin: Origin::Resumed,
            collection: None,
        }
    }

    pub fn discovered(url: Url, collection: impl Into<String>) -> Self {
        Self {
            url,
            origin: Origin::Discovered,
            collection: Some(collection.into()),
        }
    }
}
