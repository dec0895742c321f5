//! Header protection removal and payload decryption (RFC 9001 Sections 5.3, 5.4).

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Nonce,
};
use tracing::trace;

use super::error::ProbeError;
use super::header::{LongHeader, MIN_PROTECTED_LEN};
use super::keys::{InitialKeys, HP_KEY_LEN, IV_LEN};

/// Header protection sample size
const SAMPLE_LEN: usize = 16;

/// The sample is taken as if the packet number were 4 bytes long
const MAX_PN_LEN: usize = 4;

/// Decrypted client Initial packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnprotectedPacket {
    /// First byte with header protection removed
    pub first_byte: u8,
    /// Truncated packet number as sent; for a first flight this is the full value
    pub packet_number: u32,
    /// Packet number length in bytes (1-4)
    pub pn_len: usize,
    /// Plaintext frames
    pub payload: Vec<u8>,
}

/// Remove header protection and open the AEAD payload of the packet
/// described by `header`.
///
/// `data` is the datagram prefix the header was parsed from.
///
/// # Errors
///
/// - [`ProbeError::Incomplete`] if the packet extends past `data`
/// - [`ProbeError::MalformedHeader`] if the packet is too short to sample
/// - [`ProbeError::Authentication`] if the AEAD tag does not verify
pub fn unprotect(
    data: &[u8],
    header: &LongHeader,
    keys: &InitialKeys,
) -> Result<UnprotectedPacket, ProbeError> {
    if header.length < MIN_PROTECTED_LEN {
        return Err(ProbeError::MalformedHeader(
            "length too short for packet number and AEAD tag",
        ));
    }

    let end = header.packet_end()?;
    let packet = data
        .get(..end)
        .ok_or(ProbeError::Incomplete { needed: end })?;

    let sample_start = header.pn_offset + MAX_PN_LEN;
    let sample = packet
        .get(sample_start..sample_start + SAMPLE_LEN)
        .ok_or(ProbeError::MalformedHeader("header protection sample out of range"))?;
    let mask = header_protection_mask(&keys.hp, sample)?;

    // Long header: only the low four bits of the first byte are protected
    let first_byte = header.first_byte ^ (mask[0] & 0x0f);
    let pn_len = usize::from(first_byte & 0x03) + 1;

    // The sample window guarantees the packet number bytes are present
    let mut aad = packet[..header.pn_offset + pn_len].to_vec();
    aad[0] = first_byte;

    let mut packet_number = 0u32;
    for (byte, m) in aad[header.pn_offset..].iter_mut().zip(&mask[1..]) {
        *byte ^= m;
        packet_number = (packet_number << 8) | u32::from(*byte);
    }

    trace!(
        "Removed header protection: first_byte=0x{:02x}, pn={}, pn_len={}",
        first_byte,
        packet_number,
        pn_len
    );

    let ciphertext = &packet[header.pn_offset + pn_len..];
    let payload = open_payload(keys, packet_number, &aad, ciphertext)?;

    trace!("Decrypted {} bytes of payload", payload.len());

    Ok(UnprotectedPacket {
        first_byte,
        packet_number,
        pn_len,
        payload,
    })
}

/// Compute the header protection mask: AES-128-ECB over the sample.
fn header_protection_mask(hp: &[u8; HP_KEY_LEN], sample: &[u8]) -> Result<[u8; 16], ProbeError> {
    use aes::cipher::{BlockEncrypt, KeyInit};
    use aes::Aes128;

    let cipher = Aes128::new_from_slice(hp).map_err(|_| ProbeError::KeyDerivation)?;

    let mut block = [0u8; 16];
    block.copy_from_slice(sample);
    cipher.encrypt_block(aes::Block::from_mut_slice(&mut block));

    Ok(block)
}

/// AES-128-GCM open with nonce = iv XOR packet number.
fn open_payload(
    keys: &InitialKeys,
    packet_number: u32,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, ProbeError> {
    let mut nonce = keys.iv;
    for (n, p) in nonce[IV_LEN - 4..]
        .iter_mut()
        .zip(packet_number.to_be_bytes())
    {
        *n ^= p;
    }

    let cipher = Aes128Gcm::new_from_slice(&keys.key).map_err(|_| ProbeError::KeyDerivation)?;

    cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| ProbeError::Authentication)
}
