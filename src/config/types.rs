use serde::Deserialize;
use std::fmt;

/// Main configuration structure for odata-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub frontier: FrontierConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The service being crawled
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Base URL of the service; session cookies are scoped to its parent domain
    pub base_url: String,

    /// Sign-in page that starts the identity-provider handshake
    pub login_url: String,

    /// Service root documents to enumerate collections from
    pub seeds: Vec<String>,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Domains pagination links may point to; defaults to the base URL host
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

/// Sign-in credentials
///
/// Both fields may be left out of the file and supplied through the
/// `HARVEST_USERNAME` and `HARVEST_PASSWORD` environment variables.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Collections to crawl; every other collection is skipped
    pub entities: Vec<String>,

    /// Re-authentications allowed per request before it is abandoned
    pub max_retries: u32,

    /// Retries allowed per request for transport errors and 5xx/408/429
    pub transient_retries: u32,

    /// Pause before a transient retry (milliseconds)
    pub retry_delay_ms: u64,

    /// Maximum number of requests in flight
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Optional bound on the whole crawl (seconds)
    pub crawl_timeout_secs: Option<u64>,

    /// Statuses that mean the session expired; empty means every 3xx
    pub auth_redirect_statuses: Vec<u16>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            max_retries: 5,
            transient_retries: 3,
            retry_delay_ms: 500,
            max_concurrent_requests: 8,
            request_timeout_secs: 30,
            crawl_timeout_secs: None,
            auth_redirect_statuses: Vec::new(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Directory holding the cache tree
    pub directory: String,

    /// Key prefix under which records are stored
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: "./httpcache".to_string(),
            prefix: "httpcache".to_string(),
        }
    }
}

/// Frontier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FrontierConfig {
    /// SQLite database path; without one the crawl is not resumable
    pub database_path: Option<String>,

    /// Name of the set holding pending URLs
    pub set_name: String,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            set_name: crate::frontier::DEFAULT_SET_NAME.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// JSON-lines file receiving page records; records are discarded if unset
    pub records_path: Option<String>,
}

fn default_user_agent() -> String {
    concat!("odata-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}
