//! Incremental UTF-8 decoding across chunk boundaries.

/// Byte order mark, dropped when it starts the body.
const BOM: char = '\u{FEFF}';

/// A malformed byte sequence in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidUtf8 {
    /// Absolute offset of the first invalid byte
    pub offset: u64,
}

/// Stateful UTF-8 decoder.
///
/// A code point whose bytes arrive in separate chunks is held back (at most
/// three bytes) and completed by the next chunk, so splitting the body at
/// any byte never corrupts text. A leading byte order mark is dropped.
///
/// ```
/// use postsource::sse::Utf8Decoder;
///
/// let mut decoder = Utf8Decoder::new();
/// let bytes = "né".as_bytes();
/// assert_eq!(decoder.decode(&bytes[..2]).unwrap(), "n");
/// assert_eq!(decoder.decode(&bytes[2..]).unwrap(), "é");
/// ```
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Trailing bytes of an incomplete code point
    pending: Vec<u8>,
    /// Bytes consumed before `pending`
    consumed: u64,
    /// Whether the start of the body has been checked for a BOM
    bom_checked: bool,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, InvalidUtf8> {
        match self.decode_prefix(chunk) {
            (text, None) => Ok(text),
            (_, Some(err)) => Err(err),
        }
    }

    /// Decode the next chunk up to its first invalid byte.
    ///
    /// Returns the complete text before that byte along with the error, so
    /// nothing valid is lost when a chunk turns out to be malformed.
    pub fn decode_prefix(&mut self, chunk: &[u8]) -> (String, Option<InvalidUtf8>) {
        let joined;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        let (valid, error) = match std::str::from_utf8(bytes) {
            Ok(_) => (bytes.len(), None),
            Err(err) => {
                let valid = err.valid_up_to();
                let error = err.error_len().map(|_| InvalidUtf8 {
                    offset: self.consumed + valid as u64,
                });
                (valid, error)
            }
        };

        // Without an error the rest is an incomplete code point for the next chunk
        let (head, tail) = bytes.split_at(valid);
        let text = std::str::from_utf8(head).unwrap_or_default();
        self.consumed += head.len() as u64;
        if error.is_none() {
            self.pending = tail.to_vec();
        }

        if !self.bom_checked && !text.is_empty() {
            self.bom_checked = true;
            if let Some(stripped) = text.strip_prefix(BOM) {
                return (stripped.to_string(), error);
            }
        }
        (text.to_string(), error)
    }

    /// Number of bytes held back waiting for the rest of a code point.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Mark the end of the body, discarding any incomplete code point.
    ///
    /// Returns the number of discarded bytes.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"data: hi").unwrap(), "data: hi");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_code_point_split_at_every_byte() {
        let text = "日本🎉";
        let bytes = text.as_bytes();
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for byte in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(out, text);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_pending_bytes_held() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "🎉".as_bytes();
        assert_eq!(decoder.decode(&bytes[..3]).unwrap(), "");
        assert_eq!(decoder.pending_len(), 3);
        assert_eq!(decoder.decode(&bytes[3..]).unwrap(), "🎉");
    }

    #[test]
    fn test_invalid_byte_reports_absolute_offset() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"abc").unwrap();
        let err = decoder.decode(b"de\xFFf").unwrap_err();
        assert_eq!(err, InvalidUtf8 { offset: 5 });
    }

    #[test]
    fn test_invalid_continuation_after_pending() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"a\xE6").unwrap();
        let err = decoder.decode(b"z").unwrap_err();
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_prefix_before_invalid_byte_kept() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"ab").unwrap();
        let (text, err) = decoder.decode_prefix(b"c\xE6\x97\xA5\xFFd");
        assert_eq!(text, "c日");
        assert_eq!(err, Some(InvalidUtf8 { offset: 6 }));
    }

    #[test]
    fn test_prefix_completes_pending_code_point() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"\xC3").unwrap();
        let (text, err) = decoder.decode_prefix(b"\xA9x\xC0");
        assert_eq!(text, "éx");
        assert_eq!(err, Some(InvalidUtf8 { offset: 3 }));
    }

    #[test]
    fn test_leading_bom_dropped_once() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode("\u{FEFF}data".as_bytes()).unwrap(), "data");
        assert_eq!(decoder.decode("\u{FEFF}x".as_bytes()).unwrap(), "\u{FEFF}x");
    }

    #[test]
    fn test_split_bom() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"\xEF\xBB").unwrap(), "");
        assert_eq!(decoder.decode(b"\xBFok").unwrap(), "ok");
    }

    #[test]
    fn test_finish_discards_pending() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"x\xF0\x9F").unwrap();
        assert_eq!(decoder.finish(), 2);
        assert_eq!(decoder.pending_len(), 0);
    }
}
