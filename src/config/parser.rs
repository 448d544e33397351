use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding `[credentials] username`
pub const USERNAME_ENV: &str = "HARVEST_USERNAME";

/// Environment variable overriding `[credentials] password`
pub const PASSWORD_ENV: &str = "HARVEST_PASSWORD";

/// Loads and parses a configuration file from the given path
///
/// Credentials found in the environment replace the ones in the file before
/// the configuration is validated.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use odata_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Entities: {:?}", config.crawler.entities);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parses configuration text, resolving credential overrides through `env`
pub fn parse_config<F>(content: &str, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content)?;
    apply_credential_overrides(&mut config, env);
    validate(&config)?;
    Ok(config)
}

fn apply_credential_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(username) = env(USERNAME_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!("Username taken from {}", USERNAME_ENV);
        config.credentials.username = username;
    }
    if let Some(password) = env(PASSWORD_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!("Password taken from {}", PASSWORD_ENV);
        config.credentials.password = password;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between crawl runs.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
