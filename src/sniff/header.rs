//! QUIC long header parsing.
//!
//! ```text
//! +-+-+-+-+-+-+-+-+
//! |1|1|T T|X X X X|  Header Form, Fixed Bit, Type, Type-Specific Bits
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Version (32)                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | DCID Len (8)  |  Destination Connection ID (0..160)  ...
//! | SCID Len (8)  |  Source Connection ID (0..160)  ...
//! | Token Length (i) | Token (..) | Length (i) | Packet Number (8..32) | Payload
//! ```
//!
//! Only client Initial packets are accepted. The parser never reads past the
//! end of the prefix: whenever a field is cut short it reports
//! [`ProbeError::Incomplete`] with the prefix length it needs next.

use serde::Serialize;

use super::error::ProbeError;

/// Largest connection ID allowed by QUIC v1 and v2.
pub const MAX_CID_LEN: usize = 20;

/// Smallest UDP payload that may carry a client Initial (RFC 9000 Section 14.1).
pub const MIN_INITIAL_DATAGRAM: usize = 1200;

/// Bytes needed before a long header can be classified.
const MIN_CLASSIFY_LEN: usize = 5;

/// Smallest Length a protected packet can carry: the header protection
/// sample starts 4 bytes past the packet number and spans 16 bytes
/// (RFC 9001 Section 5.4.2).
pub const MIN_PROTECTED_LEN: usize = 20;

/// QUIC versions with a known Initial key schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuicVersion {
    /// QUIC version 1 (RFC 9000)
    V1,
    /// QUIC version 2 (RFC 9369)
    V2,
    /// draft-ietf-quic-transport-29
    Draft29,
}

impl QuicVersion {
    /// Look up a wire version. `None` means no key schedule is known for it.
    #[must_use]
    pub const fn from_u32(version: u32) -> Option<Self> {
        match version {
            0x0000_0001 => Some(Self::V1),
            0x6b33_43cf => Some(Self::V2),
            0xff00_001d => Some(Self::Draft29),
            _ => None,
        }
    }

    /// Wire value of this version.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::V1 => 0x0000_0001,
            Self::V2 => 0x6b33_43cf,
            Self::Draft29 => 0xff00_001d,
        }
    }
}

impl std::fmt::Display for QuicVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "QUICv1"),
            Self::V2 => write!(f, "QUICv2"),
            Self::Draft29 => write!(f, "draft-29"),
        }
    }
}

/// Long header packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuicPacketType {
    Initial,
    ZeroRtt,
    Handshake,
    Retry,
}

impl QuicPacketType {
    /// Decode the two type bits of a long header first byte.
    ///
    /// QUIC v2 rotates the type codes, so the mapping depends on the version.
    #[must_use]
    pub const fn from_header(first_byte: u8, version: QuicVersion) -> Self {
        let bits = (first_byte & 0x30) >> 4;
        match version {
            QuicVersion::V1 | QuicVersion::Draft29 => match bits {
                0 => Self::Initial,
                1 => Self::ZeroRtt,
                2 => Self::Handshake,
                _ => Self::Retry,
            },
            QuicVersion::V2 => match bits {
                1 => Self::Initial,
                2 => Self::ZeroRtt,
                3 => Self::Handshake,
                _ => Self::Retry,
            },
        }
    }
}

/// Decode a QUIC variable-length integer (RFC 9000 Section 16).
///
/// Returns the value and the number of bytes consumed, or `None` if `data`
/// is shorter than the encoding announced by its first byte.
#[must_use]
pub fn parse_varint(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    let len = 1usize << (first >> 6);
    let bytes = data.get(..len)?;

    let value = bytes[1..]
        .iter()
        .fold(u64::from(first & 0x3f), |acc, &b| (acc << 8) | u64::from(b));

    Some((value, len))
}

/// Read a varint at `pos`, asking for more data when it is cut short.
fn read_varint(data: &[u8], pos: usize) -> Result<(u64, usize), ProbeError> {
    let first = *data.get(pos).ok_or(ProbeError::Incomplete { needed: pos + 1 })?;
    let len = 1usize << (first >> 6);
    parse_varint(&data[pos..]).ok_or(ProbeError::Incomplete { needed: pos + len })
}

/// Read a length-prefixed connection ID at `pos`.
fn read_cid(data: &[u8], pos: usize) -> Result<(Vec<u8>, usize), ProbeError> {
    let len = *data.get(pos).ok_or(ProbeError::Incomplete { needed: pos + 1 })? as usize;
    if len > MAX_CID_LEN {
        return Err(ProbeError::MalformedHeader("connection ID longer than 20 bytes"));
    }

    let start = pos + 1;
    let cid = data
        .get(start..start + len)
        .ok_or(ProbeError::Incomplete { needed: start + len })?;

    Ok((cid.to_vec(), start + len))
}

/// Parsed long header of a client Initial packet, still header-protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongHeader {
    /// First byte as received (low bits still masked)
    pub first_byte: u8,
    pub version: QuicVersion,
    /// Destination Connection ID, the key derivation input
    pub dcid: Vec<u8>,
    /// Source Connection ID
    pub scid: Vec<u8>,
    /// Address validation token, usually empty
    pub token: Vec<u8>,
    /// Value of the Length field: packet number plus protected payload
    pub length: usize,
    /// Offset of the packet number, which is also the header length
    pub pn_offset: usize,
}

impl LongHeader {
    /// Parse the long header at the start of `data`.
    ///
    /// # Errors
    ///
    /// Fails fast with a structural error on short headers, a cleared fixed
    /// bit, Version Negotiation, unknown versions and non-Initial packets.
    /// A Length below [`MIN_PROTECTED_LEN`] is malformed whatever follows it.
    /// Returns [`ProbeError::Incomplete`] when the header or the packet body
    /// announced by the Length field extends past `data`.
    pub fn parse(data: &[u8]) -> Result<Self, ProbeError> {
        let first_byte = *data.first().ok_or(ProbeError::Incomplete {
            needed: MIN_CLASSIFY_LEN,
        })?;

        if first_byte & 0x80 == 0 {
            return Err(ProbeError::NotLongHeader);
        }
        if first_byte & 0x40 == 0 {
            return Err(ProbeError::MissingFixedBit);
        }
        if data.len() < MIN_CLASSIFY_LEN {
            return Err(ProbeError::Incomplete {
                needed: MIN_CLASSIFY_LEN,
            });
        }

        let raw_version = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
        if raw_version == 0 {
            return Err(ProbeError::VersionNegotiation);
        }
        let version =
            QuicVersion::from_u32(raw_version).ok_or(ProbeError::UnsupportedVersion(raw_version))?;

        let packet_type = QuicPacketType::from_header(first_byte, version);
        if packet_type != QuicPacketType::Initial {
            return Err(ProbeError::NotInitial(packet_type));
        }

        let (dcid, pos) = read_cid(data, MIN_CLASSIFY_LEN)?;
        let (scid, pos) = read_cid(data, pos)?;

        let (token_len, size) = read_varint(data, pos)?;
        let pos = pos + size;
        let token_end = usize::try_from(token_len)
            .ok()
            .and_then(|len| pos.checked_add(len))
            .ok_or(ProbeError::MalformedHeader("token length out of range"))?;
        let token = data
            .get(pos..token_end)
            .ok_or(ProbeError::Incomplete { needed: token_end })?
            .to_vec();

        let (length, size) = read_varint(data, token_end)?;
        let pn_offset = token_end + size;
        let length = usize::try_from(length)
            .map_err(|_| ProbeError::MalformedHeader("length out of range"))?;
        if length < MIN_PROTECTED_LEN {
            return Err(ProbeError::MalformedHeader(
                "length too short for packet number and AEAD tag",
            ));
        }

        let header = Self {
            first_byte,
            version,
            dcid,
            scid,
            token,
            length,
            pn_offset,
        };

        let end = header.packet_end()?;
        if end > data.len() {
            return Err(ProbeError::Incomplete { needed: end });
        }

        Ok(header)
    }

    /// Offset one past the last byte of this packet.
    ///
    /// # Errors
    ///
    /// Fails when the Length field overflows the address space.
    pub fn packet_end(&self) -> Result<usize, ProbeError> {
        self.pn_offset
            .checked_add(self.length)
            .ok_or(ProbeError::MalformedHeader("length out of range"))
    }

    /// Check the datagram around this packet.
    ///
    /// Bytes after the packet must be zero padding or a coalesced long header
    /// packet of the same version and Destination Connection ID (RFC 9000
    /// Section 12.2). The datagram must also reach the client Initial minimum
    /// size; a shorter prefix asks for more data.
    ///
    /// # Errors
    ///
    /// [`ProbeError::TrailingData`] for foreign trailing bytes,
    /// [`ProbeError::Incomplete`] for a short datagram.
    pub fn check_datagram(&self, data: &[u8]) -> Result<(), ProbeError> {
        let end = self.packet_end()?;
        let trailing = data.get(end..).unwrap_or_default();

        if trailing.iter().any(|&b| b != 0) {
            self.check_coalesced(data, end)?;
        }

        if data.len() < MIN_INITIAL_DATAGRAM {
            return Err(ProbeError::Incomplete {
                needed: MIN_INITIAL_DATAGRAM,
            });
        }

        Ok(())
    }

    fn check_coalesced(&self, data: &[u8], start: usize) -> Result<(), ProbeError> {
        let first_byte = data[start];
        if first_byte & 0xc0 != 0xc0 {
            return Err(ProbeError::TrailingData);
        }

        let cid_start = start + MIN_CLASSIFY_LEN + 1;
        if data.len() < cid_start {
            return Err(ProbeError::Incomplete { needed: cid_start });
        }

        let version = u32::from_be_bytes([
            data[start + 1],
            data[start + 2],
            data[start + 3],
            data[start + 4],
        ]);
        if version != self.version.as_u32() {
            return Err(ProbeError::TrailingData);
        }

        let dcid_len = data[start + MIN_CLASSIFY_LEN] as usize;
        if dcid_len != self.dcid.len() {
            return Err(ProbeError::TrailingData);
        }

        let dcid = data
            .get(cid_start..cid_start + dcid_len)
            .ok_or(ProbeError::Incomplete {
                needed: cid_start + dcid_len,
            })?;
        if dcid != self.dcid.as_slice() {
            return Err(ProbeError::TrailingData);
        }

        Ok(())
    }
}
