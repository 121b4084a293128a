//! Mention and enriched record data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::services::sentiment::SentimentVerdict;

/// One occurrence of a valid domain string found in a unit of scanned text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mention {
    /// Normalized (lowercased) domain, e.g. "wallet.skr"
    pub domain: String,

    /// Author identifier or handle on the social platform
    pub author: String,

    /// Identifier of the source item the mention was found in
    pub source_id: String,

    /// Raw text the mention was extracted from
    pub text: String,

    /// Timestamp of the source item, when the platform provided one
    pub created_at: Option<DateTime<Utc>>,
}

impl Mention {
    /// Dedup key: one record per (author, domain) pair.
    pub fn dedup_key(&self) -> (String, String) {
        (self.author.clone(), self.domain.clone())
    }

    /// Stable hex identifier derived from the mention identity triple.
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.author.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.domain.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.source_id.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..12])
    }
}

/// A mention enriched with author metadata, ready for analytics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRecord {
    /// The underlying mention
    #[serde(flatten)]
    pub mention: Mention,

    /// Author follower count at enrichment time
    pub follower_count: u64,

    /// Whether the author account is verified
    pub verified: bool,

    /// When the enrichment happened
    pub enriched_at: DateTime<Utc>,

    /// Sentiment verdict, present when the classification extension ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentVerdict>,
}

impl EnrichedRecord {
    /// Key under which the record is stored: author + domain.
    pub fn storage_key(&self) -> String {
        record_key(&self.mention.author, &self.mention.domain)
    }
}

/// Storage key for an (author, domain) pair.
pub fn record_key(author: &str, domain: &str) -> String {
    format!("{author}\u{1f}{domain}")
}
