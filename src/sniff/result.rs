//! Probe result types
//!
//! This module defines what the recognizer reports about a client Initial.

use serde::Serialize;

use super::header::QuicVersion;

/// Cleartext handshake metadata recovered from a ClientHello.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandshakeMetadata {
    /// Host name from the server_name extension
    pub server_name: Option<String>,
    /// Protocols from the ALPN extension, in client preference order
    pub alpn: Vec<String>,
}

impl HandshakeMetadata {
    /// Create metadata with a server name and ALPN list
    pub fn new(server_name: impl Into<String>, alpn: &[&str]) -> Self {
        Self {
            server_name: Some(server_name.into()),
            alpn: alpn.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Check if a server name was extracted
    #[must_use]
    pub const fn has_server_name(&self) -> bool {
        self.server_name.is_some()
    }
}

/// Everything the recognizer learned from one client Initial packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuicProbe {
    pub version: QuicVersion,
    /// Destination Connection ID, hex encoded
    pub dcid: String,
    /// Source Connection ID, hex encoded
    pub scid: String,
    /// Length of the address validation token
    pub token_len: usize,
    pub packet_number: u32,
    /// `None` when the ClientHello could not be recovered from this packet
    pub metadata: Option<HandshakeMetadata>,
}

impl QuicProbe {
    /// Server name, if the ClientHello carried one
    #[must_use]
    pub fn server_name(&self) -> Option<&str> {
        self.metadata.as_ref()?.server_name.as_deref()
    }

    /// ALPN protocols, empty if none were recovered
    #[must_use]
    pub fn alpn(&self) -> &[String] {
        self.metadata.as_ref().map_or(&[], |m| m.alpn.as_slice())
    }
}

/// Lowercase hex encoding for connection IDs in logs and reports
pub(crate) fn hex_id(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
