//! Golden test vectors for content identifiers.
//!
//! Any implementation that interoperates with the ledger must hash document
//! bytes to exactly these identifiers: plain SHA-256 over the raw bytes, no
//! domain prefix, rendered as `0x` + lowercase hex.

use notary_core::{hash, ContentId, HASH_ALGORITHM};

/// A golden hashing vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Document bytes.
    pub input: &'static [u8],
    /// Expected content identifier, canonical form.
    pub expected_content_id: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty document",
            input: b"",
            expected_content_id:
                "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        GoldenVector {
            name: "hello",
            input: b"hello",
            expected_content_id:
                "0x2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        },
        GoldenVector {
            name: "hello with trailing newline",
            input: b"hello\n",
            expected_content_id:
                "0x5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03",
        },
        GoldenVector {
            name: "abc",
            input: b"abc",
            expected_content_id:
                "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        GoldenVector {
            name: "quick brown fox",
            input: b"The quick brown fox jumps over the lazy dog",
            expected_content_id:
                "0xd7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592",
        },
    ]
}

/// Hash every vector and report `(name, matches, computed)`.
///
/// Call this to verify your implementation matches the reference.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let computed = hash(v.input).to_prefixed_hex();
            (v.name.to_string(), computed == v.expected_content_id, computed)
        })
        .collect()
}

/// The vectors as JSON, for sharing with other implementations.
pub fn vectors_json() -> String {
    let vectors: Vec<_> = all_vectors()
        .iter()
        .map(|v| {
            serde_json::json!({
                "name": v.name,
                "algorithm": HASH_ALGORITHM,
                "input_hex": hex::encode(v.input),
                "content_id": v.expected_content_id,
            })
        })
        .collect();
    serde_json::Value::Array(vectors).to_string()
}

/// The end-to-end notarization scenario shared by integration tests.
pub mod scenario {
    pub const SENDER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    pub const RECIPIENT: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    /// Ledger id the scenario's record lands on.
    pub const RECORD_ID: u64 = 7;
    pub const DOCUMENT: &[u8] = b"hello";
    /// One letter off from `DOCUMENT`.
    pub const TAMPERED: &[u8] = b"hallo";
    pub const CONTENT_ID: &str =
        "0x2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
}

/// Parse a vector's expected identifier.
pub fn expected_id(vector: &GoldenVector) -> notary_core::Result<ContentId> {
    ContentId::parse(vector.expected_content_id)
}
