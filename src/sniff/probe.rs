//! End-to-end recognition of a client Initial packet.

use tracing::trace;

use super::client_hello::parse_client_hello;
use super::error::ProbeError;
use super::frames::reassemble_crypto;
use super::header::LongHeader;
use super::keys::InitialKeys;
use super::protection::{unprotect, UnprotectedPacket};
use super::result::{hex_id, HandshakeMetadata, QuicProbe};

/// A client Initial whose header and payload protection were removed.
#[derive(Debug, Clone)]
pub struct DecryptedInitial {
    pub header: LongHeader,
    pub packet: UnprotectedPacket,
}

impl DecryptedInitial {
    /// Recover the ClientHello metadata from this packet's CRYPTO frames.
    ///
    /// # Errors
    ///
    /// Fails when the frames cannot be walked, the CRYPTO stream is not
    /// contiguous, or the ClientHello is not fully contained in the packet.
    pub fn metadata(&self) -> Result<HandshakeMetadata, ProbeError> {
        let stream = reassemble_crypto(&self.packet.payload)?;
        trace!("Reassembled {} bytes of CRYPTO data", stream.len());
        parse_client_hello(&stream)
    }

    /// Build a probe report, extracting metadata where possible.
    #[must_use]
    pub fn into_probe(self) -> QuicProbe {
        let metadata = self
            .metadata()
            .map_err(|e| trace!("No handshake metadata: {}", e))
            .ok();

        QuicProbe {
            version: self.header.version,
            dcid: hex_id(&self.header.dcid),
            scid: hex_id(&self.header.scid),
            token_len: self.header.token.len(),
            packet_number: self.packet.packet_number,
            metadata,
        }
    }
}

/// Recognize and decrypt the client Initial at the start of `data`.
///
/// This is the structural and cryptographic part of recognition: header
/// framing, datagram checks, key derivation and payload authentication.
///
/// # Errors
///
/// Any [`ProbeError`]. Classify it with [`ProbeError::kind`].
pub fn decrypt_initial(data: &[u8]) -> Result<DecryptedInitial, ProbeError> {
    let header = LongHeader::parse(data)?;

    trace!(
        "Parsed Initial header: version={}, dcid={}, token_len={}, length={}",
        header.version,
        hex_id(&header.dcid),
        header.token.len(),
        header.length
    );

    header.check_datagram(data)?;

    let keys = InitialKeys::derive(&header.dcid, header.version)?;
    let packet = unprotect(data, &header, &keys)?;

    Ok(DecryptedInitial { header, packet })
}

/// Recognize the client Initial at the start of `data` and report what it
/// carries.
///
/// # Errors
///
/// Same as [`decrypt_initial`]. Metadata extraction failures are not
/// errors; they leave [`QuicProbe::metadata`] empty.
pub fn probe_initial(data: &[u8]) -> Result<QuicProbe, ProbeError> {
    decrypt_initial(data).map(DecryptedInitial::into_probe)
}
