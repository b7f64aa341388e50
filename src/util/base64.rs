//! The URL payload codec used by the script-injection and pixel-beacon transports.
//!
//! [`encode`] maps text to the multi-byte form in [`crate::util::utf8`] and then to standard
//! base64 (`A-Z a-z 0-9 + /` with `=` padding). [`decode`] reverses both stages, so
//! `decode(&encode(x)) == Ok(x)` for every string.

use base64::engine::general_purpose::STANDARD;
use base64::engine::Engine as _;
use std::fmt;

use crate::util::utf8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeBase64Error {
    reason: String,
}

impl fmt::Display for DecodeBase64Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode payload: {}", self.reason)
    }
}

impl std::error::Error for DecodeBase64Error {}

/// Encodes text into a URL-embeddable token.
pub fn encode(input: &str) -> String {
    STANDARD.encode(utf8::encode(input))
}

/// Decodes a token produced by [`encode`].
///
/// Characters outside the base64 alphabet are ignored and missing padding is restored before
/// decoding.
pub fn decode(input: &str) -> Result<String, DecodeBase64Error> {
    let mut normalized: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    let remainder = normalized.len() % 4;
    if remainder != 0 {
        normalized.extend("====".chars().take(4 - remainder));
    }
    let bytes = STANDARD
        .decode(normalized.as_bytes())
        .map_err(|err| DecodeBase64Error {
            reason: err.to_string(),
        })?;
    utf8::decode(&bytes).map_err(|err| DecodeBase64Error {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_covers_empty_ascii_and_multibyte() {
        for original in [
            "",
            "hello keen",
            r#"{"page":"/checkout","amount":42}"#,
            "naïve café – 日本語 😀",
        ] {
            assert_eq!(decode(&encode(original)).unwrap(), original);
        }
    }

    #[test]
    fn matches_known_encoding() {
        assert_eq!(encode("{\"a\":1}"), "eyJhIjoxfQ==");
        assert_eq!(encode("é"), "w6k=");
    }

    #[test]
    fn decode_ignores_foreign_characters_and_missing_padding() {
        assert_eq!(decode("eyJh Ijox\nfQ").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn decode_invalid_returns_error() {
        assert!(decode("@").is_ok());
        assert!(decode("A").is_err());
    }
}
