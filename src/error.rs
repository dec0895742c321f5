//! Error types for l4quic
//!
//! Recognizer failures (malformed packets, failed decryption, unsupported
//! versions) are not errors at this level: the matcher reports them as "not
//! matched". What remains are configuration problems and failures of the
//! byte source feeding the matcher.

use std::io;

use thiserror::Error;

/// Top-level error type for l4quic
#[derive(Debug, Error)]
pub enum L4QuicError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Matching errors
    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl L4QuicError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(e) => e.is_recoverable(),
            Self::Match(e) => e.is_recoverable(),
            Self::Io(e) => is_transient(e),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, empty pattern lists)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are generally not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

/// Errors surfaced while driving a matcher over a byte source
#[derive(Debug, Error)]
pub enum MatchError {
    /// The byte source failed for a reason unrelated to the data it carries
    #[error("Failed to read from upstream: {0}")]
    UpstreamRead(#[source] io::Error),
}

impl MatchError {
    /// Check if this error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UpstreamRead(e) => is_transient(e),
        }
    }

    /// Kind of the underlying I/O error
    #[must_use]
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::UpstreamRead(e) => e.kind(),
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionReset
    )
}

/// Result type alias using `L4QuicError`
pub type Result<T> = std::result::Result<T, L4QuicError>;
