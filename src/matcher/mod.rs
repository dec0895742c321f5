//! QUIC connection matcher
//!
//! [`QuicMatcher`] decides whether the first bytes of a UDP flow are a QUIC
//! client Initial whose handshake metadata satisfies the configured
//! criteria. It is built once from a [`MatcherConfig`] and then shared
//! read-only by every connection being classified.
//!
//! # Semantics
//!
//! - No criteria: any well-formed, authenticated client Initial matches
//! - `sni`: the offered server name must match one of the patterns
//! - `alpn`: one of the offered protocols must match one of the patterns
//! - Both: both must hold
//!
//! Evaluation has three outcomes so that a caller can feed bytes as they
//! arrive; see [`MatchOutcome`] and [`QuicMatcher::match_stream`].
//!
//! # Example
//!
//! ```
//! use l4quic::config::MatcherConfig;
//! use l4quic::matcher::{MatchOutcome, QuicMatcher};
//!
//! let config = MatcherConfig::default().with_sni(["example.com"]);
//! let matcher = QuicMatcher::from_config(&config).unwrap();
//!
//! // A short header packet is rejected without waiting for more bytes
//! assert_eq!(matcher.evaluate(&[0x40, 0x00]), MatchOutcome::NotMatched);
//! ```

mod criteria;
mod pattern;
mod stream;

pub use criteria::{AlpnMatcher, ServerNameMatcher};
pub use pattern::{CaseMode, Pattern, PatternError};

use tracing::{debug, trace};

use crate::config::MatcherConfig;
use crate::error::ConfigError;
use crate::sniff::{decrypt_initial, hex_id, HandshakeMetadata};

/// Result of evaluating a byte prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// A client Initial satisfying every configured criterion
    Matched,
    /// Definitely not a matching client Initial
    NotMatched,
    /// Undecided; retry once the prefix holds this many bytes in total.
    /// Never more than the configured prefix limit.
    NeedMoreData(usize),
}

impl MatchOutcome {
    /// Collapse to a final answer when no more bytes will arrive
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Matcher for QUIC client Initial packets
#[derive(Debug, Clone)]
pub struct QuicMatcher {
    server_name: Option<ServerNameMatcher>,
    alpn: Option<AlpnMatcher>,
    max_prefix_bytes: usize,
}

impl QuicMatcher {
    /// Build a matcher from its configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn from_config(config: &MatcherConfig) -> Result<Self, ConfigError> {
        config.check_prefix_limit()?;

        Ok(Self {
            server_name: config
                .sni
                .as_deref()
                .map(ServerNameMatcher::new)
                .transpose()?,
            alpn: config.alpn.as_deref().map(AlpnMatcher::new).transpose()?,
            max_prefix_bytes: config.max_prefix_bytes,
        })
    }

    /// Matcher without criteria
    #[must_use]
    pub fn any() -> Self {
        Self {
            server_name: None,
            alpn: None,
            max_prefix_bytes: MatcherConfig::default().max_prefix_bytes,
        }
    }

    /// Most bytes this matcher will ever ask for
    #[must_use]
    pub const fn max_prefix_bytes(&self) -> usize {
        self.max_prefix_bytes
    }

    /// Whether any SNI or ALPN criterion is configured
    #[must_use]
    pub const fn has_criteria(&self) -> bool {
        self.server_name.is_some() || self.alpn.is_some()
    }

    /// Evaluate the bytes received so far.
    ///
    /// Pure function of `prefix` and this matcher: the same input always
    /// gives the same outcome.
    #[must_use]
    pub fn evaluate(&self, prefix: &[u8]) -> MatchOutcome {
        let initial = match decrypt_initial(prefix) {
            Ok(initial) => initial,
            Err(e) => {
                trace!("QUIC recognition failed ({}): {}", e.kind(), e);
                return match e.needed() {
                    Some(needed) if needed <= self.max_prefix_bytes => {
                        MatchOutcome::NeedMoreData(needed)
                    }
                    _ => MatchOutcome::NotMatched,
                };
            }
        };

        if !self.has_criteria() {
            debug!(
                "QUIC Initial matched: version={}, dcid={}",
                initial.header.version,
                hex_id(&initial.header.dcid)
            );
            return MatchOutcome::Matched;
        }

        let metadata = match initial.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("No handshake metadata: {}", e);
                return MatchOutcome::NotMatched;
            }
        };

        let matched = self.matches_metadata(&metadata);
        debug!(
            "QUIC Initial {}: dcid={}, sni={:?}, alpn={:?}",
            if matched { "matched" } else { "not matched" },
            hex_id(&initial.header.dcid),
            metadata.server_name,
            metadata.alpn
        );

        if matched {
            MatchOutcome::Matched
        } else {
            MatchOutcome::NotMatched
        }
    }

    /// Evaluate a complete datagram; insufficient data is a non-match.
    #[must_use]
    pub fn matches_datagram(&self, datagram: &[u8]) -> bool {
        self.evaluate(datagram).is_match()
    }

    /// Apply the configured criteria to extracted metadata
    #[must_use]
    pub fn matches_metadata(&self, metadata: &HandshakeMetadata) -> bool {
        if let Some(ref server_name) = self.server_name {
            if !server_name.matches(metadata.server_name.as_deref()) {
                return false;
            }
        }

        if let Some(ref alpn) = self.alpn {
            if !alpn.matches(&metadata.alpn) {
                return false;
            }
        }

        true
    }
}

impl Default for QuicMatcher {
    fn default() -> Self {
        Self::any()
    }
}
