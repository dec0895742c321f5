//! l4quic: QUIC Initial recognition for layer-4 routing
//!
//! This crate decides, from the first bytes of a UDP flow, whether the flow is
//! a QUIC connection attempt and whether the server name and application
//! protocols offered in its handshake satisfy configured criteria. It never
//! terminates or proxies the connection; it is a routing predicate.
//!
//! # Features
//!
//! - **Initial decryption**: QUIC v1, v2 and draft-29 client Initial keys,
//!   header protection removal and AES-128-GCM authentication
//! - **Handshake metadata**: server name (SNI) and ALPN list from the
//!   ClientHello carried in CRYPTO frames
//! - **Incremental evaluation**: three-outcome matching for bytes that
//!   arrive piecemeal, with a bounded prefix
//! - **Stream driver**: drive a matcher over any tokio `AsyncRead`
//!
//! # Architecture
//!
//! ```text
//! prefix → header → Initial keys → unprotect → CRYPTO → ClientHello
//!                                                            ↓
//!                                       SNI / ALPN criteria → decision
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use l4quic::config::load_config;
//! use l4quic::matcher::QuicMatcher;
//!
//! # async fn example(mut upstream: tokio::net::TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/l4quic/config.json")?;
//! let matcher = QuicMatcher::from_config(&config.matcher)?;
//!
//! let mut prefix = Vec::new();
//! if matcher.match_stream(&mut upstream, &mut prefix).await? {
//!     // hand `upstream` and the buffered `prefix` to the QUIC route
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`matcher`]: Match evaluation and the stream driver
//! - [`sniff`]: QUIC Initial recognition and metadata extraction

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod matcher;
pub mod sniff;

// Re-export commonly used types at the crate root
pub use config::{Config, MatcherConfig};
pub use error::{ConfigError, L4QuicError, MatchError};
pub use matcher::{MatchOutcome, QuicMatcher};
pub use sniff::{probe_initial, HandshakeMetadata, ProbeError, QuicProbe, QuicVersion};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
