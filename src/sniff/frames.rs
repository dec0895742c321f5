//! Frame walking and CRYPTO stream reassembly for a single Initial packet.
//!
//! Only the frames a client may put in an Initial packet are understood
//! (RFC 9000 Section 12.4). Any other type stops the walk, since its length
//! cannot be known.

use tracing::trace;

use super::error::ProbeError;
use super::header::parse_varint;

const PADDING: u64 = 0x00;
const PING: u64 = 0x01;
const ACK: u64 = 0x02;
const ACK_ECN: u64 = 0x03;
const CRYPTO: u64 = 0x06;
const CONNECTION_CLOSE: u64 = 0x1c;
const CONNECTION_CLOSE_APP: u64 = 0x1d;

/// A frame of a decrypted Initial payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A run of PADDING bytes
    Padding,
    Ping,
    Ack,
    /// Slice of the handshake stream at `offset`
    Crypto { offset: u64, data: &'a [u8] },
    ConnectionClose,
    /// Any other type; the rest of the payload cannot be framed
    Unknown(u64),
}

/// Cursor over a plaintext frame sequence.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn varint(&mut self) -> Result<u64, ProbeError> {
        let (value, len) = self
            .buf
            .get(self.pos..)
            .and_then(parse_varint)
            .ok_or(ProbeError::MalformedFrame("truncated varint"))?;
        self.pos += len;
        Ok(value)
    }

    fn bytes(&mut self, len: u64) -> Result<&'a [u8], ProbeError> {
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| self.pos.checked_add(len))
            .ok_or(ProbeError::MalformedFrame("length out of range"))?;
        let data = self
            .buf
            .get(self.pos..end)
            .ok_or(ProbeError::MalformedFrame("truncated frame"))?;
        self.pos = end;
        Ok(data)
    }

    fn frame(&mut self) -> Result<Frame<'a>, ProbeError> {
        let frame_type = self.varint()?;

        match frame_type {
            PADDING => {
                while self.buf.get(self.pos) == Some(&0) {
                    self.pos += 1;
                }
                Ok(Frame::Padding)
            }
            PING => Ok(Frame::Ping),
            ACK | ACK_ECN => {
                let _largest = self.varint()?;
                let _delay = self.varint()?;
                let range_count = self.varint()?;
                let _first_range = self.varint()?;
                for _ in 0..range_count {
                    let _gap = self.varint()?;
                    let _range = self.varint()?;
                }
                if frame_type == ACK_ECN {
                    for _ in 0..3 {
                        self.varint()?;
                    }
                }
                Ok(Frame::Ack)
            }
            CRYPTO => {
                let offset = self.varint()?;
                let len = self.varint()?;
                let data = self.bytes(len)?;
                Ok(Frame::Crypto { offset, data })
            }
            CONNECTION_CLOSE | CONNECTION_CLOSE_APP => {
                let _error_code = self.varint()?;
                if frame_type == CONNECTION_CLOSE {
                    let _offending_type = self.varint()?;
                }
                let reason_len = self.varint()?;
                self.bytes(reason_len)?;
                Ok(Frame::ConnectionClose)
            }
            other => Ok(Frame::Unknown(other)),
        }
    }
}

/// Walk the frames of `payload` and return them in order.
///
/// The walk stops after CONNECTION_CLOSE or at the first unknown type, which
/// is included as the last element.
///
/// # Errors
///
/// Returns [`ProbeError::MalformedFrame`] if a known frame is truncated.
pub fn parse_frames(payload: &[u8]) -> Result<Vec<Frame<'_>>, ProbeError> {
    let mut reader = Reader::new(payload);
    let mut frames = Vec::new();

    while !reader.is_empty() {
        let frame = reader.frame()?;
        frames.push(frame);
        if matches!(frame, Frame::ConnectionClose | Frame::Unknown(_)) {
            break;
        }
    }

    Ok(frames)
}

/// Collect the CRYPTO frames of `payload` into one contiguous handshake
/// stream starting at offset 0.
///
/// Fragments may appear in any order within the packet.
///
/// # Errors
///
/// Fails on malformed or unknown frames, on a payload without CRYPTO
/// frames, and when the fragments leave a gap or overlap.
pub fn reassemble_crypto(payload: &[u8]) -> Result<Vec<u8>, ProbeError> {
    let mut fragments: Vec<(u64, &[u8])> = Vec::new();

    for frame in parse_frames(payload)? {
        match frame {
            Frame::Crypto { offset, data } => {
                trace!("Found CRYPTO frame: offset={}, length={}", offset, data.len());
                fragments.push((offset, data));
            }
            Frame::Unknown(frame_type) => return Err(ProbeError::UnknownFrame(frame_type)),
            Frame::Padding | Frame::Ping | Frame::Ack | Frame::ConnectionClose => {}
        }
    }

    if fragments.is_empty() {
        return Err(ProbeError::NoCryptoData);
    }

    fragments.sort_by_key(|(offset, _)| *offset);

    let mut stream = Vec::new();
    let mut expected: u64 = 0;
    for (offset, data) in fragments {
        if offset > expected {
            return Err(ProbeError::CryptoGap {
                expected,
                found: offset,
            });
        }
        if offset < expected {
            return Err(ProbeError::CryptoOverlap(offset));
        }
        stream.extend_from_slice(data);
        expected += data.len() as u64;
    }

    Ok(stream)
}
