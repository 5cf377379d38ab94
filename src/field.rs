//! Loosely typed envelope values.
//!
//! The protocol envelope deliberately distinguishes "native text" from "raw
//! bytes": status lines and header fields must be text, body chunks and
//! write-callback arguments must be bytes. A handler passing the wrong kind
//! is exactly the class of drift this crate exists to catch, so the boundary
//! keeps both representations expressible instead of collapsing them into a
//! single static type.

use std::fmt;

/// A value that arrived at the envelope boundary as either native text or
/// raw bytes.
///
/// # Examples
///
/// ```
/// use envelope_lint::RawValue;
///
/// let status = RawValue::text("200 OK");
/// assert_eq!(status.to_text(), "200 OK");
///
/// let chunk = RawValue::bytes(b"payload".to_vec());
/// assert!(!chunk.is_text());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Native text, as header names/values and status lines must be.
    Text(String),
    /// Raw bytes, as body chunks must be.
    Bytes(Vec<u8>),
}

impl RawValue {
    /// Wraps native text.
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// Wraps raw bytes.
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        RawValue::Bytes(value.into())
    }

    /// Returns the text content, or `None` for a byte value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Bytes(_) => None,
        }
    }

    /// Returns the byte content, or `None` for a text value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RawValue::Text(_) => None,
            RawValue::Bytes(b) => Some(b),
        }
    }

    /// True when the value is native text.
    pub fn is_text(&self) -> bool {
        matches!(self, RawValue::Text(_))
    }

    /// Coerces the value to text, decoding byte values as Latin-1.
    ///
    /// Latin-1 decoding is total (every byte maps to one char), so this
    /// never fails and never alters byte values that were Latin-1 text to
    /// begin with.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Bytes(b) => latin1_decode(b),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// True when every character of `value` maps to a single byte in ISO-8859-1.
///
/// Header names and values must satisfy this; `"100€"` does not.
///
/// # Examples
///
/// ```
/// use envelope_lint::is_latin1;
///
/// assert!(is_latin1("useful-inførmation-5"));
/// assert!(!is_latin1("100€"));
/// ```
pub fn is_latin1(value: &str) -> bool {
    value.chars().all(|c| (c as u32) <= 0xFF)
}

/// Decodes bytes as Latin-1, mapping each byte to the code point of the
/// same value.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encodes Latin-1-representable text back to its single-byte form.
///
/// Returns `None` when the text contains characters above U+00FF.
pub fn latin1_encode(value: &str) -> Option<Vec<u8>> {
    value
        .chars()
        .map(|c| u32::from(c).try_into().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_bytes_accessors() {
        let text = RawValue::text("foo");
        assert_eq!(text.as_text(), Some("foo"));
        assert_eq!(text.as_bytes(), None);

        let bytes = RawValue::bytes(b"foo".to_vec());
        assert_eq!(bytes.as_text(), None);
        assert_eq!(bytes.as_bytes(), Some(&b"foo"[..]));
    }

    #[test]
    fn to_text_coerces_both_representations() {
        assert_eq!(RawValue::text("foo").to_text(), "foo");
        assert_eq!(RawValue::bytes(b"foo".to_vec()).to_text(), "foo");
    }

    #[test]
    fn latin1_accepts_accented_text() {
        assert!(is_latin1("useful-inførmation-5"));
        assert!(is_latin1("/umläut"));
    }

    #[test]
    fn latin1_rejects_wide_characters() {
        assert!(!is_latin1("100€"));
        assert!(!is_latin1("X-€"));
    }

    #[test]
    fn latin1_round_trip() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        let decoded = latin1_decode(&all_bytes);
        assert_eq!(latin1_encode(&decoded), Some(all_bytes));
    }

    #[test]
    fn latin1_encode_rejects_wide_characters() {
        assert_eq!(latin1_encode("100€"), None);
    }
}
