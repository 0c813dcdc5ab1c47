//! Escape-based frame delimiting for a raw byte stream.
//!
//! Wire format:
//! ```text
//! [END] escaped-payload-bytes... [END]
//! ```
//! Inside a frame, the two reserved byte values are replaced by two-byte
//! escape sequences:
//!
//! | raw byte | on the wire        |
//! |----------|--------------------|
//! | `0xC0`   | `0xDB 0xDC`        |
//! | `0xDB`   | `0xDB 0xDD`        |
//!
//! Any other byte travels unchanged.  Note that the marker values `0xDC` and
//! `0xDD` are *not* reserved: outside an escape sequence they are ordinary
//! payload bytes and pass through literally.
//!
//! The codec knows nothing about what the payload means; the envelope layer
//! ([`crate::protocol`]) interprets the decoded bytes.

mod decoder;
mod encoder;

pub use decoder::{FrameDecoder, FrameProgress};
pub use encoder::FrameEncoder;

use thiserror::Error;

/// Frame delimiter byte.
pub const END: u8 = 0xC0;
/// Escape introducer byte.
pub const ESC: u8 = 0xDB;
/// Escaped form of [`END`] (follows an [`ESC`]).
pub const ESC_END: u8 = 0xDC;
/// Escaped form of [`ESC`] (follows an [`ESC`]).
pub const ESC_ESC: u8 = 0xDD;

/// Errors produced while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum FrameError {
    /// The frame does not fit in the codec's fixed-capacity buffer.
    #[error("frame exceeds buffer capacity")]
    TooBig,

    /// The byte stream violates the escape rules (an escape introducer
    /// followed by anything other than the two defined marker bytes).
    #[error("malformed escape sequence in frame")]
    InvalidFrame,
}

/// Worst-case encoded size for `raw_len` payload bytes: every byte escaped
/// plus the two delimiters.
pub const fn max_encoded_len(raw_len: usize) -> usize {
    raw_len * 2 + 2
}
