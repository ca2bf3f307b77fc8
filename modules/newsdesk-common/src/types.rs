use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// --- Articles ---

/// A collected article as seen by the dedup stage. Read-only here; the
/// collectors and scraper own its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Hex SHA-256 of the canonical article URL. See [`url_hash`].
    pub url_hash: String,
    pub title: String,
    /// Human-readable feed name, e.g. "Reuters".
    pub source: String,
    /// Editorial trust of the feed. 1 is highest; larger is lower.
    pub feed_priority: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
}

impl Article {
    /// Publication time when the feed supplied one, otherwise collection time.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.collected_at)
    }
}

/// Fixed-length content key for an article URL.
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    hex::encode(hasher.finalize())
}

// --- Duplicate groups ---

/// One same-story cluster: the canonical article that proceeds through the
/// pipeline and every other member that should be suppressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub canonical_url_hash: String,
    pub duplicate_url_hashes: Vec<String>,
    /// Mean confidence of the directly compared pairs inside the cluster.
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
}

impl DuplicateGroup {
    /// Canonical plus duplicates.
    pub fn member_count(&self) -> usize {
        self.duplicate_url_hashes.len() + 1
    }

    pub fn contains(&self, url_hash: &str) -> bool {
        self.canonical_url_hash == url_hash
            || self.duplicate_url_hashes.iter().any(|h| h == url_hash)
    }
}
