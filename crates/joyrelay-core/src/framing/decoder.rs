//! Streaming frame decoder fed one wire byte at a time.

use super::{FrameError, END, ESC, ESC_END, ESC_ESC};

/// Outcome of feeding one byte to the decoder.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FrameProgress {
    /// The byte was consumed; the frame is still in progress.
    Consumed,
    /// A closing delimiter was seen.  The decoded frame contents are
    /// available via [`FrameDecoder::frame`] until the next
    /// [`reset`](FrameDecoder::reset).
    EndOfFrame,
}

/// Per-connection streaming decoder.
///
/// The decoder holds an escape flag and an output buffer capped at a fixed
/// maximum.  After [`FrameProgress::EndOfFrame`] or any [`FrameError`], the
/// caller must call [`reset`](FrameDecoder::reset) before feeding further
/// bytes; the state machine does not recover on its own.  Either way the
/// connection stays usable — a corrupt frame only costs that frame.
pub struct FrameDecoder {
    buf: Vec<u8>,
    capacity: usize,
    in_escape: bool,
}

impl FrameDecoder {
    /// Creates a decoder accepting frames of up to `capacity` decoded bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
            in_escape: false,
        }
    }

    /// Clears the output buffer and the escape flag, discarding any frame in
    /// progress.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_escape = false;
    }

    /// Feeds one wire byte to the state machine.
    ///
    /// # Errors
    ///
    /// - [`FrameError::TooBig`] if the decoded frame no longer fits in the
    ///   buffer.
    /// - [`FrameError::InvalidFrame`] if an escape introducer is followed by
    ///   anything other than the two defined marker bytes (including a
    ///   second escape introducer).
    pub fn decode_byte(&mut self, byte: u8) -> Result<FrameProgress, FrameError> {
        if self.buf.len() >= self.capacity {
            return Err(FrameError::TooBig);
        }

        match byte {
            END => {
                // End of message, even mid-escape.
                self.in_escape = false;
                Ok(FrameProgress::EndOfFrame)
            }
            ESC => {
                if self.in_escape {
                    return Err(FrameError::InvalidFrame);
                }
                self.in_escape = true;
                Ok(FrameProgress::Consumed)
            }
            ESC_END => {
                if self.in_escape {
                    self.in_escape = false;
                    self.buf.push(END);
                } else {
                    // Not an escape sequence, just a byte whose value
                    // collides with the marker constant.
                    self.buf.push(byte);
                }
                Ok(FrameProgress::Consumed)
            }
            ESC_ESC => {
                if self.in_escape {
                    self.in_escape = false;
                    self.buf.push(ESC);
                } else {
                    self.buf.push(byte);
                }
                Ok(FrameProgress::Consumed)
            }
            other => {
                if self.in_escape {
                    return Err(FrameError::InvalidFrame);
                }
                self.buf.push(other);
                Ok(FrameProgress::Consumed)
            }
        }
    }

    /// The decoded frame contents accumulated so far.
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
