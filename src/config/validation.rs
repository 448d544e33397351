use crate::config::types::{CacheConfig, Config, CrawlerConfig, CredentialsConfig, ServiceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    validate_credentials(&config.credentials)?;
    validate_crawler_config(&config.crawler)?;
    validate_cache_config(&config.cache)?;
    Ok(())
}

/// Parses an http(s) URL, naming the offending field on failure
pub(crate) fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("{} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!("{} has no host: '{}'", field, value)));
    }

    Ok(url)
}

/// Validates the service section
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let base_url = parse_http_url("base-url", &config.base_url)?;
    crate::url::cookie_domain(&base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("base-url: {}", e)))?;

    parse_http_url("login-url", &config.login_url)?;

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }
    for seed in &config.seeds {
        parse_http_url("seed", seed)?;
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for domain in &config.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// Validates the credentials, after environment overrides have been applied
fn validate_credentials(config: &CredentialsConfig) -> Result<(), ConfigError> {
    if config.username.trim().is_empty() {
        return Err(ConfigError::Validation(
            "username cannot be empty (set it in [credentials] or HARVEST_USERNAME)".to_string(),
        ));
    }
    if config.password.is_empty() {
        return Err(ConfigError::Validation(
            "password cannot be empty (set it in [credentials] or HARVEST_PASSWORD)".to_string(),
        ));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation(
            "entities cannot be empty: nothing would be crawled".to_string(),
        ));
    }

    if config.entities.iter().any(|e| e.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "entities cannot contain empty names".to_string(),
        ));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.crawl_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "crawl-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    if let Some(status) = config
        .auth_redirect_statuses
        .iter()
        .find(|s| !(300..400).contains(*s))
    {
        return Err(ConfigError::Validation(format!(
            "auth-redirect-statuses must be 3xx codes, got {}",
            status
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    let prefix = config.prefix.trim_matches('/');
    if prefix.is_empty() {
        return Err(ConfigError::Validation(
            "cache prefix cannot be empty".to_string(),
        ));
    }
    if prefix.split('/').any(|s| matches!(s, "" | "." | "..")) {
        return Err(ConfigError::Validation(format!(
            "cache prefix must be a plain relative path, got '{}'",
            config.prefix
        )));
    }

    Ok(())
}

/// Validates a domain pattern
///
/// Valid patterns:
/// - Exact domain: "example.com", "sub.example.com"
/// - Wildcard: "*.example.com"
///
/// Invalid patterns:
/// - Empty string
/// - Just "*"
/// - Wildcard not at start: "example.*.com"
/// - Multiple wildcards: "*.*.example.com"
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if pattern == "*" {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be just '*'".to_string(),
        ));
    }

    let wildcard_count = pattern.matches('*').count();
    if wildcard_count > 1 {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern can only have one wildcard: '{}'",
            pattern
        )));
    }

    if wildcard_count == 1 && !pattern.starts_with("*.") {
        return Err(ConfigError::InvalidPattern(format!(
            "Wildcard must be at the start followed by a dot: '{}'",
            pattern
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{FrontierConfig, OutputConfig};

    fn valid_config() -> Config {
        Config {
            service: ServiceConfig {
                base_url: "https://crm.example.com".to_string(),
                login_url: "https://crm.example.com/?whr=https://sts.example.com".to_string(),
                seeds: vec![
                    "https://crm.example.com/XRMServices/2011/OrganizationData.svc/".to_string(),
                ],
                user_agent: "odata-harvest/1.0".to_string(),
                allowed_domains: vec![],
            },
            credentials: CredentialsConfig {
                username: "mr_flibble".to_string(),
                password: "P455w0rd".to_string(),
            },
            crawler: CrawlerConfig {
                entities: vec!["optevia_servicedeliverySet".to_string()],
                ..CrawlerConfig::default()
            },
            cache: CacheConfig::default(),
            frontier: FrontierConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = valid_config();
        config.service.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_base_url_needs_parent_domain() {
        let mut config = valid_config();
        config.service.base_url = "http://localhost".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_non_http_seed() {
        let mut config = valid_config();
        config.service.seeds = vec!["ftp://crm.example.com/".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_credentials() {
        let mut config = valid_config();
        config.credentials.password = String::new();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = valid_config();
        config.credentials.username = "  ".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_entities() {
        let mut config = valid_config();
        config.crawler.entities.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = valid_config();
        config.crawler.max_concurrent_requests = 0;
        assert!(validate(&config).is_err());

        config.crawler.max_concurrent_requests = 101;
        assert!(validate(&config).is_err());

        config.crawler.max_concurrent_requests = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_auth_redirect_statuses_must_be_redirects() {
        let mut config = valid_config();
        config.crawler.auth_redirect_statuses = vec![302, 401];
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_cache_prefix() {
        let mut config = valid_config();
        config.cache.prefix = "/".to_string();
        assert!(validate(&config).is_err());

        config.cache.prefix = "../escape".to_string();
        assert!(validate(&config).is_err());

        config.cache.prefix = "crm/httpcache".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_domain_patterns() {
        assert!(validate_domain_pattern("crm.example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*").is_err());
        assert!(validate_domain_pattern("crm.*.com").is_err());
        assert!(validate_domain_pattern("*.*.example.com").is_err());
    }
}
