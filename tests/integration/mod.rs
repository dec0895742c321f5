//! Integration tests for l4quic
//!
//! These tests drive the public API with captured and synthetic client
//! Initial datagrams from `tests/data/`.
//!
//! # Test Organization
//!
//! - `quic_matcher`: match decisions for captured datagrams and criteria
//! - `sniff_report`: probe reports for every supported version and layout
//! - `stream_driver`: the async driver over in-memory connections
//! - `config_file`: configuration files feeding the matcher
//!
//! # Fixtures
//!
//! - `packet1.bin`, `packet2.bin`, `packet3.bin`: captured QUIC v1 client
//!   Initials for `example.com` offering `h3`, `custom` and `h3`/`h3-29`
//! - The remaining files are sealed with the standard Initial keys and carry
//!   the ClientHello of `packet3.bin`

pub mod config_file;
pub mod quic_matcher;
pub mod stream_driver;

pub const PACKET1: &[u8] = include_bytes!("../data/packet1.bin");
pub const PACKET2: &[u8] = include_bytes!("../data/packet2.bin");
pub const PACKET3: &[u8] = include_bytes!("../data/packet3.bin");
pub const V2_INITIAL: &[u8] = include_bytes!("../data/v2_initial.bin");
pub const DRAFT29_INITIAL: &[u8] = include_bytes!("../data/draft29_initial.bin");
pub const SPLIT_CRYPTO: &[u8] = include_bytes!("../data/split_crypto.bin");
pub const PARTIAL_CLIENT_HELLO: &[u8] = include_bytes!("../data/partial_client_hello.bin");
pub const CRYPTO_GAP: &[u8] = include_bytes!("../data/crypto_gap.bin");
pub const WITH_TOKEN: &[u8] = include_bytes!("../data/with_token.bin");
pub const COALESCED_HANDSHAKE: &[u8] = include_bytes!("../data/coalesced_handshake.bin");

/// The three captured datagrams
pub const CAPTURED: [&[u8]; 3] = [PACKET1, PACKET2, PACKET3];
