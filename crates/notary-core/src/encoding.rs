//! Textual encoding of fixed-width identifiers.
//!
//! Every identifier that crosses a component boundary uses one canonical form:
//! a `0x` prefix followed by lowercase hexadecimal digits. Parsing is lenient
//! about the prefix and letter case so that values produced by the ledger
//! (`0x`-prefixed, sometimes mixed case) and by plain hex digests (no prefix)
//! normalise to the same bytes.

use thiserror::Error;

/// Prefix carried by every canonical identifier string.
pub const HEX_PREFIX: &str = "0x";

/// Why a hex string could not be decoded into a fixed-width value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// Wrong number of hex digits after the prefix was removed.
    #[error("expected {expected} hex digits, got {got}")]
    Length { expected: usize, got: usize },

    /// A character outside `[0-9a-fA-F]`.
    #[error("non-hex character")]
    Digit,
}

/// Remove surrounding whitespace and an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode `N` bytes from hex, accepting either prefix convention and any case.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let digits = strip_hex_prefix(s);
    if digits.len() != N * 2 {
        return Err(HexError::Length {
            expected: N * 2,
            got: digits.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|_| HexError::Digit)?;
    Ok(out)
}

/// Encode bytes in the canonical form: `0x` + lowercase hex.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(HEX_PREFIX.len() + bytes.len() * 2);
    out.push_str(HEX_PREFIX);
    out.push_str(&hex::encode(bytes));
    out
}

/// Normalise any accepted spelling of an `N`-byte identifier to canonical form.
pub fn normalize<const N: usize>(s: &str) -> Result<String, HexError> {
    decode_fixed::<N>(s).map(|bytes| encode_prefixed(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_variants() {
        assert_eq!(strip_hex_prefix("0xabcd"), "abcd");
        assert_eq!(strip_hex_prefix("0XABCD"), "ABCD");
        assert_eq!(strip_hex_prefix("abcd"), "abcd");
        assert_eq!(strip_hex_prefix("  0xab  "), "ab");
    }

    #[test]
    fn test_decode_accepts_both_prefix_conventions() {
        let a = decode_fixed::<2>("0xBEEF").unwrap();
        let b = decode_fixed::<2>("beef").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, [0xbe, 0xef]);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            decode_fixed::<2>("0xbee"),
            Err(HexError::Length { expected: 4, got: 3 })
        );
        // A double prefix leaves "0x" in the digits.
        assert!(decode_fixed::<2>("0x0xbe").is_err());
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert_eq!(decode_fixed::<2>("zzzz"), Err(HexError::Digit));
        assert_eq!(HexError::Digit.to_string(), "non-hex character");
        assert_eq!(
            HexError::Length { expected: 64, got: 4 }.to_string(),
            "expected 64 hex digits, got 4"
        );
    }

    #[test]
    fn test_normalize_is_lowercase_prefixed() {
        assert_eq!(normalize::<2>("BEEF").unwrap(), "0xbeef");
        assert_eq!(normalize::<2>("0xBeEf").unwrap(), "0xbeef");
    }
}
