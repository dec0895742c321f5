//! QUIC Initial packet recognition
//!
//! This module recognizes client Initial packets and recovers the cleartext
//! handshake metadata they carry, without taking part in the connection.
//!
//! # Pipeline
//!
//! 1. **Header parsing**: long header framing, version, connection IDs,
//!    token and Length field
//! 2. **Key derivation**: client Initial keys from the Destination
//!    Connection ID and the version's salt
//! 3. **Unprotection**: header protection removal and AES-128-GCM open
//! 4. **CRYPTO reassembly**: CRYPTO frames of the packet, in offset order
//! 5. **ClientHello parsing**: server name and ALPN list
//!
//! # Supported Versions
//!
//! - QUIC v1 (RFC 9000 / RFC 9001)
//! - QUIC v2 (RFC 9369)
//! - draft-29
//!
//! # Example
//!
//! ```no_run
//! use l4quic::sniff::probe_initial;
//!
//! let datagram: &[u8] = &[/* client Initial datagram */];
//! if let Ok(probe) = probe_initial(datagram) {
//!     println!("QUIC {} to {:?}", probe.version, probe.server_name());
//! }
//! ```

mod client_hello;
mod error;
mod frames;
mod header;
mod keys;
mod probe;
mod protection;
mod result;

pub use client_hello::parse_client_hello;
pub use error::{FailureKind, ProbeError};
pub use frames::{parse_frames, reassemble_crypto, Frame};
pub use header::{
    parse_varint, LongHeader, QuicPacketType, QuicVersion, MAX_CID_LEN, MIN_INITIAL_DATAGRAM,
    MIN_PROTECTED_LEN,
};
pub use keys::InitialKeys;
pub use probe::{decrypt_initial, probe_initial, DecryptedInitial};
pub use protection::{unprotect, UnprotectedPacket};
pub use result::{HandshakeMetadata, QuicProbe};

pub(crate) use result::hex_id;
