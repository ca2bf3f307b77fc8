use anyhow::{Context, Result};
use tracing::info;

use crate::detector::{DetectionResult, DuplicateDetector};
use crate::store::DuplicateStore;

/// One dedup pass: load candidates, detect, persist.
///
/// Storage errors propagate to the caller. Detection is never retried or
/// undone because of them; the next pass simply re-derives everything from
/// whatever candidates remain unflagged.
pub async fn run_dedup_pass(
    store: &dyn DuplicateStore,
    detector: &DuplicateDetector,
    dry_run: bool,
) -> Result<DetectionResult> {
    let articles = store
        .candidate_articles()
        .await
        .context("Failed to load dedup candidates")?;
    info!(candidates = articles.len(), "Loaded dedup candidates");

    let result = detector.detect_duplicates(&articles).await;

    if dry_run {
        for group in &result.groups {
            info!(
                canonical = %group.canonical_url_hash,
                duplicates = ?group.duplicate_url_hashes,
                confidence = group.confidence,
                "Dry run: would record duplicate group"
            );
        }
        return Ok(result);
    }

    if !result.groups.is_empty() {
        let flagged = store
            .save_duplicate_groups(&result.groups)
            .await
            .context("Failed to save duplicate groups")?;
        info!(groups = result.groups.len(), flagged, "Recorded duplicate groups");
    }

    Ok(result)
}
