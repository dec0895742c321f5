//! Initial packet protection keys (RFC 9001 Section 5.2, RFC 9369 Section 3.3).
//!
//! ```text
//! initial_secret = HKDF-Extract(initial_salt, client_dst_connection_id)
//! client_initial_secret = HKDF-Expand-Label(initial_secret, "client in", "", 32)
//! key = HKDF-Expand-Label(client_initial_secret, "quic key", "", 16)
//! iv  = HKDF-Expand-Label(client_initial_secret, "quic iv", "", 12)
//! hp  = HKDF-Expand-Label(client_initial_secret, "quic hp", "", 16)
//! ```
//!
//! The salt and the key/iv/hp labels are fixed per version. Anyone who sees
//! the Destination Connection ID can derive these keys.

use hkdf::Hkdf;
use sha2::Sha256;

use super::error::ProbeError;
use super::header::QuicVersion;

/// AES-128-GCM key size
pub const KEY_LEN: usize = 16;

/// AES-128-GCM nonce size
pub const IV_LEN: usize = 12;

/// Header protection key size (AES-128)
pub const HP_KEY_LEN: usize = 16;

const SECRET_LEN: usize = 32;

/// Per-version constants of the Initial key schedule.
struct Schedule {
    salt: [u8; 20],
    key_label: &'static str,
    iv_label: &'static str,
    hp_label: &'static str,
}

const V1_SCHEDULE: Schedule = Schedule {
    salt: [
        0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8,
        0x0c, 0xad, 0xcc, 0xbb, 0x7f, 0x0a,
    ],
    key_label: "quic key",
    iv_label: "quic iv",
    hp_label: "quic hp",
};

const V2_SCHEDULE: Schedule = Schedule {
    salt: [
        0x0d, 0xed, 0xe3, 0xde, 0xf7, 0x00, 0xa6, 0xdb, 0x81, 0x93, 0x81, 0xbe, 0x6e, 0x26,
        0x9d, 0xcb, 0xf9, 0xbd, 0x2e, 0xd9,
    ],
    key_label: "quicv2 key",
    iv_label: "quicv2 iv",
    hp_label: "quicv2 hp",
};

const DRAFT29_SCHEDULE: Schedule = Schedule {
    salt: [
        0xaf, 0xbf, 0xec, 0x28, 0x99, 0x93, 0xd2, 0x4c, 0x9e, 0x97, 0x86, 0xf1, 0x9c, 0x61,
        0x11, 0xe0, 0x43, 0x90, 0xa8, 0x99,
    ],
    key_label: "quic key",
    iv_label: "quic iv",
    hp_label: "quic hp",
};

const fn schedule(version: QuicVersion) -> &'static Schedule {
    match version {
        QuicVersion::V1 => &V1_SCHEDULE,
        QuicVersion::V2 => &V2_SCHEDULE,
        QuicVersion::Draft29 => &DRAFT29_SCHEDULE,
    }
}

/// Client Initial keys for one connection.
///
/// Not secret, but never logged.
pub struct InitialKeys {
    /// AEAD key
    pub key: [u8; KEY_LEN],
    /// AEAD nonce base
    pub iv: [u8; IV_LEN],
    /// Header protection key
    pub hp: [u8; HP_KEY_LEN],
}

impl std::fmt::Debug for InitialKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitialKeys").finish_non_exhaustive()
    }
}

impl InitialKeys {
    /// Derive the client Initial keys from the Destination Connection ID.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::KeyDerivation`] if HKDF rejects an output length.
    pub fn derive(dcid: &[u8], version: QuicVersion) -> Result<Self, ProbeError> {
        let schedule = schedule(version);

        let initial = Hkdf::<Sha256>::new(Some(&schedule.salt[..]), dcid);
        let mut client_secret = [0u8; SECRET_LEN];
        expand_label(&initial, "client in", &mut client_secret)?;

        // The client secret is already a PRK; expand from it directly.
        let client =
            Hkdf::<Sha256>::from_prk(&client_secret).map_err(|_| ProbeError::KeyDerivation)?;

        let mut keys = Self {
            key: [0u8; KEY_LEN],
            iv: [0u8; IV_LEN],
            hp: [0u8; HP_KEY_LEN],
        };
        expand_label(&client, schedule.key_label, &mut keys.key)?;
        expand_label(&client, schedule.iv_label, &mut keys.iv)?;
        expand_label(&client, schedule.hp_label, &mut keys.hp)?;
        Ok(keys)
    }
}

/// TLS 1.3 HKDF-Expand-Label with an empty context.
fn expand_label(prk: &Hkdf<Sha256>, label: &str, out: &mut [u8]) -> Result<(), ProbeError> {
    let info = hkdf_label_info(label, out.len());
    prk.expand(&info, out).map_err(|_| ProbeError::KeyDerivation)
}

/// Build the `HkdfLabel` structure.
///
/// ```text
/// struct {
///     uint16 length;
///     opaque label<7..255> = "tls13 " + Label;
///     opaque context<0..255>;
/// } HkdfLabel;
/// ```
fn hkdf_label_info(label: &str, length: usize) -> Vec<u8> {
    const PREFIX: &[u8] = b"tls13 ";

    let label_len = PREFIX.len() + label.len();
    let mut info = Vec::with_capacity(2 + 1 + label_len + 1);

    #[allow(clippy::cast_possible_truncation)]
    {
        info.extend_from_slice(&(length as u16).to_be_bytes());
        info.push(label_len as u8);
    }
    info.extend_from_slice(PREFIX);
    info.extend_from_slice(label.as_bytes());
    info.push(0);

    info
}
