//! Incremental frame encoder writing into a fixed worst-case buffer.

use super::{max_encoded_len, FrameError, END, ESC, ESC_END, ESC_ESC};

/// Encodes one frame at a time into an internal fixed-capacity buffer.
///
/// The buffer is sized once for the largest raw message the caller intends to
/// send (`2 * raw_len + 2`, see [`max_encoded_len`]), so a sequence of
/// `begin` / `put` / `finish` calls never allocates.  Exceeding the capacity
/// fails with [`FrameError::TooBig`] and the frame must be restarted with
/// [`begin`](FrameEncoder::begin).
///
/// # Examples
///
/// ```rust
/// use joyrelay_core::framing::FrameEncoder;
///
/// let mut enc = FrameEncoder::for_raw_len(8);
/// enc.begin();
/// for b in [0x01, 0xC0, 0x02] {
///     enc.put(b).unwrap();
/// }
/// enc.finish().unwrap();
/// assert_eq!(enc.encoded(), &[0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xC0]);
/// ```
pub struct FrameEncoder {
    buf: Vec<u8>,
    capacity: usize,
}

impl FrameEncoder {
    /// Creates an encoder able to hold a frame of up to `raw_len` payload
    /// bytes in fully-escaped form.
    pub fn for_raw_len(raw_len: usize) -> Self {
        let capacity = max_encoded_len(raw_len);
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Starts a new frame, discarding anything previously encoded, and
    /// writes the opening delimiter.
    pub fn begin(&mut self) {
        self.buf.clear();
        self.buf.push(END);
    }

    /// Appends one raw byte, escaping it if it collides with a reserved
    /// value.
    ///
    /// # Errors
    ///
    /// [`FrameError::TooBig`] if the encoded form would overflow the buffer;
    /// the frame is left uncommitted and must be restarted.
    pub fn put(&mut self, byte: u8) -> Result<(), FrameError> {
        match byte {
            END => {
                self.push_checked(ESC)?;
                self.push_checked(ESC_END)
            }
            ESC => {
                self.push_checked(ESC)?;
                self.push_checked(ESC_ESC)
            }
            other => self.push_checked(other),
        }
    }

    /// Appends a run of raw bytes.  Equivalent to calling
    /// [`put`](FrameEncoder::put) for each byte.
    pub fn put_all(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        for &b in bytes {
            self.put(b)?;
        }
        Ok(())
    }

    /// Writes the closing delimiter, completing the frame.
    pub fn finish(&mut self) -> Result<(), FrameError> {
        self.push_checked(END)
    }

    /// The encoded frame committed so far.
    pub fn encoded(&self) -> &[u8] {
        &self.buf
    }

    fn push_checked(&mut self, byte: u8) -> Result<(), FrameError> {
        if self.buf.len() >= self.capacity {
            return Err(FrameError::TooBig);
        }
        self.buf.push(byte);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &[u8]) -> Vec<u8> {
        let mut enc = FrameEncoder::for_raw_len(raw.len());
        enc.begin();
        enc.put_all(raw).unwrap();
        enc.finish().unwrap();
        enc.encoded().to_vec()
    }

    #[test]
    fn test_plain_bytes_pass_through_between_delimiters() {
        assert_eq!(encode(&[1, 2, 3]), vec![END, 1, 2, 3, END]);
    }

    #[test]
    fn test_empty_frame_is_two_delimiters() {
        assert_eq!(encode(&[]), vec![END, END]);
    }

    #[test]
    fn test_delimiter_byte_is_escaped() {
        assert_eq!(encode(&[END]), vec![END, ESC, ESC_END, END]);
    }

    #[test]
    fn test_escape_byte_is_escaped() {
        assert_eq!(encode(&[ESC]), vec![END, ESC, ESC_ESC, END]);
    }

    #[test]
    fn test_marker_values_are_not_escaped() {
        // ESC_END / ESC_ESC are only special after an ESC.
        assert_eq!(encode(&[ESC_END, ESC_ESC]), vec![END, ESC_END, ESC_ESC, END]);
    }

    #[test]
    fn test_worst_case_input_fits_exactly() {
        let raw = vec![END; 16];
        let encoded = encode(&raw);
        assert_eq!(encoded.len(), max_encoded_len(16));
    }

    #[test]
    fn test_overflow_returns_too_big() {
        let mut enc = FrameEncoder::for_raw_len(2);
        enc.begin();
        enc.put(0x01).unwrap();
        enc.put(0x02).unwrap();
        // Buffer is 2*2+2 = 6; delimiter + 2 bytes leaves room for 3 more,
        // so two escaped bytes cannot fit.
        enc.put(END).unwrap();
        assert_eq!(enc.put(END), Err(FrameError::TooBig));
    }

    #[test]
    fn test_begin_discards_previous_frame() {
        let mut enc = FrameEncoder::for_raw_len(4);
        enc.begin();
        enc.put(0xAA).unwrap();
        enc.begin();
        enc.finish().unwrap();
        assert_eq!(enc.encoded(), &[END, END]);
    }
}
