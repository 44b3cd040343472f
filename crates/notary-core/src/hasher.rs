//! The content hasher: document bytes to a fixed-width content identifier.
//!
//! This is the one hashing routine shared by every component. The store uses
//! it when a document is uploaded and the verifier uses it when a candidate
//! file is checked, so both sides always agree on algorithm and encoding:
//! plain SHA-256 over the raw bytes, no domain prefix, no length framing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::encoding::{decode_fixed, encode_prefixed};
use crate::error::CoreError;

/// Name of the digest behind every [`ContentId`].
pub const HASH_ALGORITHM: &str = "sha-256";

/// A 32-byte content identifier: the SHA-256 digest of a document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(pub [u8; 32]);

impl ContentId {
    /// Length of the canonical text form (`0x` + 64 hex digits).
    pub const ENCODED_LEN: usize = 2 + 64;

    /// Hash a byte sequence. Total: the empty input has a fixed identifier.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Bare lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Canonical boundary form: `0x` + lowercase hex.
    pub fn to_prefixed_hex(&self) -> String {
        encode_prefixed(&self.0)
    }

    /// Parse from hex with or without `0x`, in any letter case.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        decode_fixed::<32>(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidContentId {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Hash a byte sequence into its content identifier.
pub fn hash(data: &[u8]) -> ContentId {
    ContentId::of(data)
}

/// Hash everything readable from `reader`, in fixed-size chunks.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<ContentId> {
    let mut hasher = ContentHasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Incremental form of [`hash`] for input that arrives in pieces.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> ContentId {
        ContentId(self.inner.finalize().into())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_prefixed_hex())
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for ContentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ContentId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_hex())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_hash_known_value() {
        assert_eq!(hash(b"hello").to_hex(), HELLO_SHA256);
    }

    #[test]
    fn test_hash_empty_input() {
        assert_eq!(hash(b"").to_hex(), EMPTY_SHA256);
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(hash(data), hash(data));
        assert_ne!(hash(data), hash(b"different data"));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"hel");
        hasher.update(b"");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize(), hash(b"hello"));
    }

    #[test]
    fn test_hash_reader_matches_one_shot() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let id = hash_reader(std::io::Cursor::new(&data)).unwrap();
        assert_eq!(id, hash(&data));
    }

    #[test]
    fn test_parse_prefix_and_case() {
        let canonical = hash(b"hello");
        let upper = HELLO_SHA256.to_uppercase();
        assert_eq!(ContentId::parse(HELLO_SHA256).unwrap(), canonical);
        assert_eq!(ContentId::parse(&format!("0x{HELLO_SHA256}")).unwrap(), canonical);
        assert_eq!(ContentId::parse(&format!("0x{upper}")).unwrap(), canonical);
        assert_eq!(ContentId::parse(&upper).unwrap(), canonical);
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!(ContentId::parse("0x2cf24dba").is_err());
        assert!(ContentId::parse("").is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        let id = hash(b"hello");
        let shown = id.to_string();
        assert_eq!(shown.len(), ContentId::ENCODED_LEN);
        assert_eq!(shown, format!("0x{HELLO_SHA256}"));
    }

    #[test]
    fn test_debug() {
        let debug = format!("{:?}", hash(b"hello"));
        assert_eq!(debug, "ContentId(2cf24dba5fb0a30e...)");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
                prop_assert_eq!(hash(&data), hash(&data));
            }

            #[test]
            fn distinct_inputs_distinct_ids(
                a in proptest::collection::vec(any::<u8>(), 0..512),
                b in proptest::collection::vec(any::<u8>(), 0..512),
            ) {
                prop_assume!(a != b);
                prop_assert_ne!(hash(&a), hash(&b));
            }

            #[test]
            fn text_form_parses_back(data in proptest::collection::vec(any::<u8>(), 0..64)) {
                let id = hash(&data);
                prop_assert_eq!(ContentId::parse(&id.to_prefixed_hex()).unwrap(), id);
                prop_assert_eq!(ContentId::parse(&id.to_hex().to_uppercase()).unwrap(), id);
            }
        }
    }
}
