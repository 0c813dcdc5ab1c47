//! Composition of the envelope and framing layers into one transmit buffer.

use thiserror::Error;

use crate::framing::{FrameEncoder, FrameError};
use crate::protocol::envelope::{encode_envelope, EnvelopeError};
use crate::protocol::messages::MessageTag;

/// Errors from building a transmit-ready message.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum WireError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Builds the complete on-the-wire form of one message: envelope around the
/// payload, then the whole envelope frame-encoded.
///
/// The frame buffer is sized for the worst case (every envelope byte
/// escaped), so framing cannot overflow; the only realistic failure is a
/// payload too large for the envelope's 16-bit length field.
pub fn encode_message(tag: MessageTag, payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let envelope = encode_envelope(tag as u16, payload)?;

    let mut framer = FrameEncoder::for_raw_len(envelope.wire_len());
    framer.begin();
    for part in envelope.parts() {
        framer.put_all(part)?;
    }
    framer.finish()?;
    Ok(framer.encoded().to_vec())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
