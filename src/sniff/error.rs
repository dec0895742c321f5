//! Failure taxonomy of the Initial packet recognizer.
//!
//! Every stage of the pipeline reports a [`ProbeError`]. None of them is ever
//! surfaced to the routing layer: [`ProbeError::kind`] maps each one onto a
//! [`FailureKind`], and the matcher turns that into either "not matched" or
//! "need more data".

use std::fmt;

use thiserror::Error;

use super::header::QuicPacketType;

/// Coarse classification of a recognizer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bytes do not have the shape of a QUIC Initial packet
    StructuralMismatch,
    /// Header protection sample underflow or AEAD tag mismatch
    CryptographicFailure,
    /// A decision needs more bytes than are available
    InsufficientData,
    /// Long header carries a version without a known key schedule
    UnsupportedVersion,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuralMismatch => write!(f, "structural mismatch"),
            Self::CryptographicFailure => write!(f, "cryptographic failure"),
            Self::InsufficientData => write!(f, "insufficient data"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
        }
    }
}

/// Error raised while recognizing or unprotecting a client Initial packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Header form bit is clear (short header)
    #[error("not a long header packet")]
    NotLongHeader,

    /// Fixed bit is clear
    #[error("fixed bit not set")]
    MissingFixedBit,

    /// Version 0 denotes Version Negotiation
    #[error("version negotiation packet")]
    VersionNegotiation,

    /// Version without a known Initial salt
    #[error("unsupported QUIC version: 0x{0:08x}")]
    UnsupportedVersion(u32),

    /// Long header packet of another type
    #[error("not an Initial packet: {0:?}")]
    NotInitial(QuicPacketType),

    /// The prefix ends before the field being decoded
    #[error("need {needed} bytes")]
    Incomplete {
        /// Total prefix length required to make progress
        needed: usize,
    },

    /// Header field violates the wire format
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    /// Bytes after the first packet do not belong to the same datagram
    #[error("trailing bytes are not a coalesced packet of the same connection")]
    TrailingData,

    /// HKDF rejected an Initial key derivation
    #[error("initial key derivation failed")]
    KeyDerivation,

    /// AEAD open failed
    #[error("payload authentication failed")]
    Authentication,

    /// Frame sequence could not be walked
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// Frame type outside the set allowed in Initial packets
    #[error("unexpected frame type 0x{0:02x}")]
    UnknownFrame(u64),

    /// The packet carries no CRYPTO frames
    #[error("no CRYPTO data in packet")]
    NoCryptoData,

    /// CRYPTO fragments do not form one contiguous run from offset zero
    #[error("CRYPTO stream gap: expected offset {expected}, found {found}")]
    CryptoGap { expected: u64, found: u64 },

    /// Two CRYPTO fragments cover the same stream offsets
    #[error("CRYPTO stream overlap at offset {0}")]
    CryptoOverlap(u64),

    /// Handshake message could not be walked up to its extensions
    #[error("malformed ClientHello: {0}")]
    MalformedClientHello(&'static str),
}

impl ProbeError {
    /// Classify this failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Incomplete { .. } => FailureKind::InsufficientData,
            Self::UnsupportedVersion(_) => FailureKind::UnsupportedVersion,
            Self::KeyDerivation | Self::Authentication => FailureKind::CryptographicFailure,
            _ => FailureKind::StructuralMismatch,
        }
    }

    /// Prefix length that would let the recognizer make progress, if any.
    #[must_use]
    pub const fn needed(&self) -> Option<usize> {
        match self {
            Self::Incomplete { needed } => Some(*needed),
            _ => None,
        }
    }
}
