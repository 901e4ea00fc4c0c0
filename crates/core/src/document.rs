//! Source and assembled documents.
//!
//! The engine treats document content as an opaque byte stream; only the
//! assembled output is known to be JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// MIME type recorded on assembled output documents.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Lifecycle of a stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Captured,
    Registered,
    Assembled,
    Failed,
}

/// A stored document with its raw content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,

    pub original_filename: String,

    /// MIME type (e.g. "text/plain", "application/json")
    pub content_type: String,

    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of `content`
    pub content_multihash: String,

    #[serde(default)]
    pub status: DocumentStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<u8>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a document, deriving its size and content hash.
    pub fn new(
        document_id: impl Into<String>,
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            document_id: document_id.into(),
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            size_bytes: content.len() as u64,
            content_multihash: content_hash(&content),
            status: DocumentStatus::Captured,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn content_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Whether `content_multihash` still matches `content`.
    pub fn verify_hash(&self) -> bool {
        content_hash(&self.content) == self.content_multihash
    }
}

/// Hex SHA-256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
