//! Turns resolved clusters into the records callers persist and filter on.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use newsdesk_common::DuplicateGroup;

use crate::cluster::Cluster;

/// Convert clusters into persisted group records plus the flat set of
/// non-canonical hashes later stages should skip.
pub fn emit_groups(
    clusters: &[Cluster<'_>],
    detected_at: DateTime<Utc>,
) -> (Vec<DuplicateGroup>, HashSet<String>) {
    let mut duplicate_ids = HashSet::new();
    let groups = clusters
        .iter()
        .map(|cluster| {
            let duplicate_url_hashes: Vec<String> = cluster
                .duplicates
                .iter()
                .map(|a| a.url_hash.clone())
                .collect();
            duplicate_ids.extend(duplicate_url_hashes.iter().cloned());

            DuplicateGroup {
                canonical_url_hash: cluster.canonical.url_hash.clone(),
                duplicate_url_hashes,
                confidence: cluster.confidence,
                detected_at,
            }
        })
        .collect();

    (groups, duplicate_ids)
}
