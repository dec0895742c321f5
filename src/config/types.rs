//! Configuration types for l4quic
//!
//! This module defines all configuration structures used by the matcher and
//! the `l4quic` binary. Configuration is loaded from JSON files and can be
//! validated at startup.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matcher::QuicMatcher;
use crate::sniff::MIN_INITIAL_DATAGRAM;

/// Largest prefix the matcher may be configured to buffer
pub const MAX_PREFIX_LIMIT: usize = 65535;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Match criteria
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// UDP listener used by the binary
    #[serde(default)]
    pub listen: ListenConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matcher.validate()?;
        self.listen.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// QUIC matcher criteria
///
/// An absent list places no constraint on that dimension. With both absent
/// every well-formed client Initial matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatcherConfig {
    /// Server name patterns (any may match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<Vec<String>>,

    /// ALPN protocol patterns (any may match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,

    /// Most bytes buffered before giving up on a connection
    #[serde(default = "default_max_prefix_bytes")]
    pub max_prefix_bytes: usize,
}

impl MatcherConfig {
    /// Matcher requiring one of `patterns` as server name
    #[must_use]
    pub fn with_sni<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.sni = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Matcher requiring one of `patterns` among the offered ALPN protocols
    #[must_use]
    pub fn with_alpn<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.alpn = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Validate matcher criteria by compiling them
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty pattern list, an
    /// invalid pattern, or a prefix limit outside `1200..=65535`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        QuicMatcher::from_config(self).map(drop)
    }

    /// Check the prefix limit against the datagram minimum and the hard cap
    pub(crate) fn check_prefix_limit(&self) -> Result<(), ConfigError> {
        if !(MIN_INITIAL_DATAGRAM..=MAX_PREFIX_LIMIT).contains(&self.max_prefix_bytes) {
            return Err(ConfigError::ValidationError(format!(
                "matcher.max_prefix_bytes must be between {MIN_INITIAL_DATAGRAM} and {MAX_PREFIX_LIMIT}, got {}",
                self.max_prefix_bytes
            )));
        }
        Ok(())
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            sni: None,
            alpn: None,
            max_prefix_bytes: default_max_prefix_bytes(),
        }
    }
}

/// UDP listen configuration for the dry-run binary
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenConfig {
    /// Listen address (e.g., "127.0.0.1:4433")
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,

    /// Time allowed to collect a decision, in milliseconds
    #[serde(default = "default_sniff_timeout_ms")]
    pub sniff_timeout_ms: u64,
}

impl ListenConfig {
    /// Validate listen configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the sniff timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sniff_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "listen.sniff_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Get sniff timeout as Duration
    #[must_use]
    pub const fn sniff_timeout(&self) -> Duration {
        Duration::from_millis(self.sniff_timeout_ms)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            sniff_timeout_ms: default_sniff_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate logging configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unknown level or format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(
            self.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "log.level '{}' is not one of trace, debug, info, warn, error",
                self.level
            )));
        }
        if !matches!(self.format.as_str(), "json" | "text") {
            return Err(ConfigError::ValidationError(format!(
                "log.format must be 'json' or 'text', got '{}'",
                self.format
            )));
        }
        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
            target: true,
        }
    }
}

// Default value functions for serde

const fn default_true() -> bool {
    true
}

const fn default_max_prefix_bytes() -> usize {
    8192
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4433))
}

const fn default_sniff_timeout_ms() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}
