//! Line framing between the serial byte stream and text messages.
//!
//! Wire format towards the browser:
//! ```text
//! serial bytes:   3 4 . 5 \r \n
//! message text:   "34.5"
//! ```
//! A line is every byte up to and including [`LINE_TERMINATOR`].  After UTF-8
//! decoding, leading and trailing whitespace (which covers `\r` and `\n`) is
//! stripped.
//!
//! In the other direction a message is written verbatim: no terminator is
//! appended, so a sketch that wants the device to see a newline must include
//! it in the message itself.

use thiserror::Error;

/// Byte that ends one line on the serial side.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Errors produced while turning serial bytes into text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    /// The line contains bytes that are not valid UTF-8.
    ///
    /// This usually means the baud rate does not match the device, or the
    /// device was reset mid-transmission.
    #[error("line of {len} bytes is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize, len: usize },
}

/// Decodes one raw serial line into message text.
///
/// # Errors
///
/// Returns [`LineError::InvalidUtf8`] if `raw` is not valid UTF-8.  The caller
/// is expected to drop the line and carry on.
///
/// # Examples
///
/// ```rust
/// use serial_link::decode_line;
///
/// assert_eq!(decode_line(b"12\r\n").unwrap(), "12");
/// assert_eq!(decode_line(b"  hello world \n").unwrap(), "hello world");
/// assert!(decode_line(&[0xFF, 0xFE, b'\n']).is_err());
/// ```
pub fn decode_line(raw: &[u8]) -> Result<String, LineError> {
    let text = std::str::from_utf8(raw).map_err(|e| LineError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
        len: raw.len(),
    })?;
    Ok(text.trim().to_string())
}

/// Encodes one message for the serial device.
///
/// The bytes are exactly the UTF-8 encoding of `text`.
pub fn encode_message(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_crlf() {
        assert_eq!(decode_line(b"12\r\n").unwrap(), "12");
    }

    #[test]
    fn test_decode_strips_bare_lf() {
        assert_eq!(decode_line(b"34\n").unwrap(), "34");
    }

    #[test]
    fn test_decode_strips_surrounding_whitespace() {
        // Arrange: tabs and spaces around the payload, interior space kept
        let raw = b"\t x: 1, y: 2  \r\n";

        // Act
        let text = decode_line(raw).unwrap();

        // Assert
        assert_eq!(text, "x: 1, y: 2");
    }

    #[test]
    fn test_decode_partial_line_without_terminator() {
        // A read timeout mid-line hands over whatever arrived.
        assert_eq!(decode_line(b"51").unwrap(), "51");
    }

    #[test]
    fn test_decode_blank_line_is_empty_string() {
        assert_eq!(decode_line(b"\r\n").unwrap(), "");
    }

    #[test]
    fn test_decode_multibyte_utf8() {
        assert_eq!(decode_line("température=21°C\n".as_bytes()).unwrap(), "température=21°C");
    }

    #[test]
    fn test_decode_invalid_utf8_reports_position() {
        // Arrange: two valid bytes followed by a lone continuation byte
        let raw = [b'o', b'k', 0x80, b'\n'];

        // Act
        let err = decode_line(&raw).unwrap_err();

        // Assert
        assert_eq!(
            err,
            LineError::InvalidUtf8 {
                valid_up_to: 2,
                len: 4
            }
        );
    }

    #[test]
    fn test_encode_adds_no_terminator() {
        assert_eq!(encode_message("on"), b"on".to_vec());
    }

    #[test]
    fn test_encode_keeps_embedded_newline() {
        assert_eq!(encode_message("led 1\n"), b"led 1\n".to_vec());
    }

    #[test]
    fn test_encode_empty_message_is_empty() {
        assert!(encode_message("").is_empty());
    }
}
