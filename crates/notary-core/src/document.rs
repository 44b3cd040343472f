//! Stored documents and their listing summaries.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::hasher::{hash, ContentId};
use crate::types::AccountId;

/// A document held by the content store, keyed by its content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content_id: ContentId,
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
    /// The account that first uploaded these bytes.
    pub owner: AccountId,
    /// Local time of the first upload (Unix ms).
    pub stored_at: i64,
}

impl StoredDocument {
    /// Build a document, deriving its identifier from `bytes`.
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
        owner: AccountId,
        stored_at: i64,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            content_id: hash(&bytes),
            bytes,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
            owner,
            stored_at,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            file_name: self.file_name.clone(),
            content_id: self.content_id,
            stored_at: self.stored_at,
        }
    }
}

/// One row of an owner's document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub file_name: String,
    pub content_id: ContentId,
    pub stored_at: i64,
}

/// Sort summaries by storage time, then identifier.
pub fn sort_summaries(summaries: &mut [DocumentSummary]) {
    summaries.sort_by(|a, b| {
        a.stored_at
            .cmp(&b.stored_at)
            .then_with(|| a.content_id.cmp(&b.content_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> AccountId {
        AccountId::new("alice").unwrap()
    }

    #[test]
    fn test_new_derives_content_id() {
        let doc = StoredDocument::new(&b"hello"[..], "text/plain", "hello.txt", owner(), 5);
        assert_eq!(doc.content_id, hash(b"hello"));
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.summary().file_name, "hello.txt");
    }

    #[test]
    fn test_sort_summaries_breaks_ties_by_id() {
        let a = hash(b"a");
        let b = hash(b"b");
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let mut rows = vec![
            DocumentSummary { file_name: "late".into(), content_id: low, stored_at: 20 },
            DocumentSummary { file_name: "tie-high".into(), content_id: high, stored_at: 10 },
            DocumentSummary { file_name: "tie-low".into(), content_id: low, stored_at: 10 },
        ];
        sort_summaries(&mut rows);
        let names: Vec<_> = rows.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, ["tie-low", "tie-high", "late"]);
    }
}
