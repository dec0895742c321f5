//! Server name and ALPN sub-matchers.
//!
//! Each holds a non-empty pattern list; any pattern may match.

use tracing::trace;

use super::pattern::{CaseMode, Pattern};
use crate::error::ConfigError;

fn compile<S: AsRef<str>>(field: &str, patterns: &[S]) -> Result<Vec<Pattern>, ConfigError> {
    if patterns.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "matcher.{field} must not be empty when present"
        )));
    }

    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Pattern::parse(p).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "matcher.{field} pattern '{p}' is invalid: {e}"
                ))
            })
        })
        .collect()
}

/// Matches the server name offered in the ClientHello
#[derive(Debug, Clone)]
pub struct ServerNameMatcher {
    patterns: Vec<Pattern>,
}

impl ServerNameMatcher {
    /// Compile a server name pattern list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty list or an
    /// invalid pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            patterns: compile("sni", patterns)?,
        })
    }

    /// Check an offered server name. An absent name never matches.
    #[must_use]
    pub fn matches(&self, server_name: Option<&str>) -> bool {
        let Some(name) = server_name else {
            trace!("No server name offered");
            return false;
        };
        // An absolute name refers to the same host
        let name = name.strip_suffix('.').unwrap_or(name);

        self.patterns
            .iter()
            .any(|p| p.matches(name, CaseMode::Insensitive))
    }

    /// Configured patterns
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

/// Matches the protocols offered in the ALPN extension
#[derive(Debug, Clone)]
pub struct AlpnMatcher {
    patterns: Vec<Pattern>,
}

impl AlpnMatcher {
    /// Compile an ALPN pattern list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty list or an
    /// invalid pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            patterns: compile("alpn", patterns)?,
        })
    }

    /// Check the offered protocols. At least one must match a pattern.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, offered: &[S]) -> bool {
        offered.iter().any(|proto| {
            self.patterns
                .iter()
                .any(|p| p.matches(proto.as_ref(), CaseMode::Sensitive))
        })
    }

    /// Configured patterns
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}
