//! Raw ClientHello parsing (TLS 1.3 handshake message, no record layer).
//!
//! ```text
//! HandshakeType (1) = 0x01 | Length (3)
//! legacy_version (2) | random (32)
//! legacy_session_id <0..32>             1-byte length
//! cipher_suites <2..2^16-2>             2-byte length
//! legacy_compression_methods <1..2^8-1> 1-byte length
//! extensions <8..2^16-1>                2-byte length, then (type:2, len:2, value)*
//! ```
//!
//! Only server_name and application_layer_protocol_negotiation are read. A
//! malformed value drops that field only; a malformed extension header ends
//! the walk with whatever was already found.

use tracing::trace;

use super::error::ProbeError;
use super::result::HandshakeMetadata;

const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const EXT_SERVER_NAME: u16 = 0x0000;
const EXT_ALPN: u16 = 0x0010;
const NAME_TYPE_HOST_NAME: u8 = 0x00;

/// Big-endian reader over a byte slice.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let data = self.buf.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(data)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Take a vector with a 1-byte length prefix
    fn vec8(&mut self) -> Option<&'a [u8]> {
        let len = self.u8()?;
        self.take(usize::from(len))
    }

    /// Take a vector with a 2-byte length prefix
    fn vec16(&mut self) -> Option<&'a [u8]> {
        let len = self.u16()?;
        self.take(usize::from(len))
    }
}

/// Extract server name and ALPN list from a reassembled ClientHello.
///
/// # Errors
///
/// Returns [`ProbeError::MalformedClientHello`] when the message is not a
/// ClientHello, its declared length exceeds the available bytes, or the
/// fixed fields before the extensions cannot be walked.
pub fn parse_client_hello(data: &[u8]) -> Result<HandshakeMetadata, ProbeError> {
    let mut cursor = Cursor::new(data);

    let msg_type = cursor
        .u8()
        .ok_or(ProbeError::MalformedClientHello("empty handshake stream"))?;
    if msg_type != HANDSHAKE_CLIENT_HELLO {
        return Err(ProbeError::MalformedClientHello("not a ClientHello"));
    }

    let len = cursor
        .take(3)
        .map(|b| (usize::from(b[0]) << 16) | (usize::from(b[1]) << 8) | usize::from(b[2]))
        .ok_or(ProbeError::MalformedClientHello("truncated handshake header"))?;
    let body = cursor
        .take(len)
        .ok_or(ProbeError::MalformedClientHello("declared length exceeds data"))?;

    let mut body = Cursor::new(body);
    body.take(2 + 32)
        .ok_or(ProbeError::MalformedClientHello("truncated version or random"))?;
    body.vec8()
        .ok_or(ProbeError::MalformedClientHello("truncated session id"))?;
    body.vec16()
        .ok_or(ProbeError::MalformedClientHello("truncated cipher suites"))?;
    body.vec8()
        .ok_or(ProbeError::MalformedClientHello("truncated compression methods"))?;

    let mut metadata = HandshakeMetadata::default();
    if body.remaining() == 0 {
        return Ok(metadata);
    }

    // A short extensions block keeps the extensions that are fully present
    let declared = body
        .u16()
        .ok_or(ProbeError::MalformedClientHello("truncated extensions length"))?;
    let available = body.remaining().min(usize::from(declared));
    let mut extensions = Cursor::new(body.take(available).unwrap_or_default());

    while extensions.remaining() > 0 {
        let Some((ext_type, value)) = extensions.u16().zip(extensions.vec16()) else {
            trace!("Truncated extension header, stopping");
            break;
        };

        match ext_type {
            EXT_SERVER_NAME if metadata.server_name.is_none() => {
                metadata.server_name = parse_server_name(value);
                match metadata.server_name {
                    Some(ref name) => trace!("Found SNI: {}", name),
                    None => trace!("Malformed server_name extension"),
                }
            }
            EXT_ALPN if metadata.alpn.is_empty() => {
                metadata.alpn = parse_alpn(value).unwrap_or_else(|| {
                    trace!("Malformed ALPN extension");
                    Vec::new()
                });
            }
            _ => {}
        }
    }

    Ok(metadata)
}

/// Parse the server_name extension value, returning the first host name.
///
/// Host names are ASCII only (RFC 6066 Section 3): internationalized names
/// travel as punycode A-labels, so a name with a NUL or any byte above 0x7f
/// is treated as no name at all.
fn parse_server_name(value: &[u8]) -> Option<String> {
    let mut ext = Cursor::new(value);
    let mut list = Cursor::new(ext.vec16()?);

    while list.remaining() > 0 {
        let name_type = list.u8()?;
        let name = list.vec16()?;
        if name_type != NAME_TYPE_HOST_NAME {
            continue;
        }
        if name.is_empty() || name.iter().any(|&b| b == 0 || !b.is_ascii()) {
            return None;
        }
        return std::str::from_utf8(name).ok().map(str::to_string);
    }

    None
}

/// Parse the ALPN extension value into its protocol list.
fn parse_alpn(value: &[u8]) -> Option<Vec<String>> {
    let mut ext = Cursor::new(value);
    let mut list = Cursor::new(ext.vec16()?);
    let mut protocols = Vec::new();

    while list.remaining() > 0 {
        let proto = list.vec8()?;
        if proto.is_empty() {
            return None;
        }
        if let Ok(proto) = std::str::from_utf8(proto) {
            protocols.push(proto.to_string());
        }
    }

    Some(protocols)
}
