//! Self-describing, checksummed message envelope.
//!
//! Wire format (inside a frame, all integers little-endian):
//! ```text
//! [tag:2][length:2][payload:length][checksum:2]
//! ```
//! The checksum is the wrapping 16-bit sum of every header byte and every
//! payload byte.  It is a plain additive sum, not a CRC; the algorithm is
//! part of the wire format and must not be substituted.

use thiserror::Error;

/// Size of the envelope header (tag + length).
pub const HEADER_SIZE: usize = 4;
/// Size of the envelope footer (checksum).
pub const FOOTER_SIZE: usize = 2;

/// Errors produced while encoding or decoding an envelope.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EnvelopeError {
    /// The payload cannot be described by the 16-bit length field.
    #[error("payload of {0} bytes exceeds the 16-bit length field")]
    PayloadTooLarge(usize),

    /// The buffer is shorter than header + footer.
    #[error("envelope truncated: {0} bytes is below the 6-byte minimum")]
    Truncated(usize),

    /// The stored length disagrees with the physical byte count.
    #[error("length mismatch: header says {declared}, buffer holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The recomputed checksum disagrees with the stored one.
    #[error("checksum mismatch: computed {computed:#06x}, stored {stored:#06x}")]
    ChecksumMismatch { computed: u16, stored: u16 },
}

/// A decoded envelope: a zero-copy view into the frame buffer.
///
/// The payload borrows the caller's buffer; the buffer must stay untouched
/// for as long as the view is used.
#[derive(Debug, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub tag: u16,
    pub payload: &'a [u8],
}

/// An encoded envelope: owned header and footer framing a borrowed payload.
///
/// No payload copy is made; [`parts`](EncodedEnvelope::parts) yields the
/// three byte regions in wire order so the caller can stream them straight
/// into a frame encoder.
pub struct EncodedEnvelope<'a> {
    header: [u8; HEADER_SIZE],
    payload: &'a [u8],
    footer: [u8; FOOTER_SIZE],
}

impl<'a> EncodedEnvelope<'a> {
    /// The header, payload, and footer regions in transmit order.
    pub fn parts(&self) -> [&[u8]; 3] {
        [&self.header, self.payload, &self.footer]
    }

    /// Total encoded size (header + payload + footer).
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + FOOTER_SIZE
    }
}

/// Wrapping 16-bit byte sum over the given regions, in order.
fn byte_sum<'a>(regions: impl IntoIterator<Item = &'a [u8]>) -> u16 {
    let mut sum: u16 = 0;
    for region in regions {
        for &b in region {
            sum = sum.wrapping_add(u16::from(b));
        }
    }
    sum
}

/// Wraps `payload` in an envelope carrying `tag`.
///
/// # Errors
///
/// [`EnvelopeError::PayloadTooLarge`] if the payload exceeds 65535 bytes.
pub fn encode_envelope(tag: u16, payload: &[u8]) -> Result<EncodedEnvelope<'_>, EnvelopeError> {
    let length =
        u16::try_from(payload.len()).map_err(|_| EnvelopeError::PayloadTooLarge(payload.len()))?;

    let mut header = [0u8; HEADER_SIZE];
    header[0..2].copy_from_slice(&tag.to_le_bytes());
    header[2..4].copy_from_slice(&length.to_le_bytes());

    let checksum = byte_sum([&header[..], payload]);

    Ok(EncodedEnvelope {
        header,
        payload,
        footer: checksum.to_le_bytes(),
    })
}

/// Validates and unwraps an envelope from a decoded frame.
///
/// Validation order: size floor, declared-vs-physical length, checksum over
/// every byte except the trailing checksum field itself.
///
/// # Errors
///
/// Any [`EnvelopeError`] variant other than `PayloadTooLarge`.
pub fn decode_envelope(buf: &[u8]) -> Result<Envelope<'_>, EnvelopeError> {
    if buf.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(EnvelopeError::Truncated(buf.len()));
    }

    let tag = u16::from_le_bytes([buf[0], buf[1]]);
    let declared = usize::from(u16::from_le_bytes([buf[2], buf[3]]));
    let actual = buf.len() - HEADER_SIZE - FOOTER_SIZE;
    if declared != actual {
        return Err(EnvelopeError::LengthMismatch { declared, actual });
    }

    let body_end = buf.len() - FOOTER_SIZE;
    let computed = byte_sum([&buf[..body_end]]);
    let stored = u16::from_le_bytes([buf[body_end], buf[body_end + 1]]);
    if computed != stored {
        return Err(EnvelopeError::ChecksumMismatch { computed, stored });
    }

    Ok(Envelope {
        tag,
        payload: &buf[HEADER_SIZE..body_end],
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
