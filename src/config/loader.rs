//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed or validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    config.validate()?;

    info!(
        "Configuration loaded: sni={:?}, alpn={:?}, max_prefix_bytes={}",
        config.matcher.sni, config.matcher.alpn, config.matcher.max_prefix_bytes
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `L4QUIC_LISTEN_ADDR`: Override listen address
/// - `L4QUIC_LOG_LEVEL`: Override log level
/// - `L4QUIC_SNI`: Override server name patterns (comma-separated)
/// - `L4QUIC_ALPN`: Override ALPN patterns (comma-separated)
/// - `L4QUIC_MAX_PREFIX_BYTES`: Override the prefix buffering limit
///
/// # Errors
///
/// Returns `ConfigError` if loading, parsing or an override fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = load_config(path)?;
    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Apply `L4QUIC_*` overrides read through `lookup`, then re-validate.
///
/// # Errors
///
/// Returns `ConfigError::EnvError` for unparsable values and
/// `ConfigError::ValidationError` if the result is invalid.
pub fn apply_env_overrides(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(addr) = lookup("L4QUIC_LISTEN_ADDR") {
        config.listen.address = addr.parse().map_err(|_| ConfigError::EnvError {
            name: "L4QUIC_LISTEN_ADDR".into(),
            reason: format!("Invalid socket address: {addr}"),
        })?;
        debug!("Listen address overridden to {}", config.listen.address);
    }

    if let Some(level) = lookup("L4QUIC_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Some(sni) = lookup("L4QUIC_SNI") {
        config.matcher.sni = Some(split_list(&sni));
        debug!("SNI patterns overridden to {:?}", config.matcher.sni);
    }

    if let Some(alpn) = lookup("L4QUIC_ALPN") {
        config.matcher.alpn = Some(split_list(&alpn));
        debug!("ALPN patterns overridden to {:?}", config.matcher.alpn);
    }

    if let Some(max) = lookup("L4QUIC_MAX_PREFIX_BYTES") {
        config.matcher.max_prefix_bytes = max.parse().map_err(|_| ConfigError::EnvError {
            name: "L4QUIC_MAX_PREFIX_BYTES".into(),
            reason: format!("Invalid number: {max}"),
        })?;
        debug!(
            "Max prefix bytes overridden to {}",
            config.matcher.max_prefix_bytes
        );
    }

    // Re-validate after overrides
    config.validate()?;

    Ok(config)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}
