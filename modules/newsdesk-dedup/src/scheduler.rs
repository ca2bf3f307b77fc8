//! Drives candidate pairs through the oracle in fixed-size chunks.
//!
//! Each chunk is dispatched at once and awaited as a whole before the next
//! chunk starts, so at most `max_concurrent` comparisons are ever in flight
//! and chunk k+1 never overlaps chunk k.

use futures::future::join_all;
use tracing::{debug, warn};

use newsdesk_common::Article;

use crate::comparison::{Comparator, ComparisonOutcome};

/// A compared pair and what the oracle said about it.
#[derive(Debug, Clone)]
pub struct PairResult<'a> {
    pub a: &'a Article,
    pub b: &'a Article,
    pub outcome: ComparisonOutcome,
}

pub async fn compare_pairs<'a>(
    comparator: &Comparator,
    pairs: &[(&'a Article, &'a Article)],
    max_concurrent: usize,
) -> Vec<PairResult<'a>> {
    let chunk_size = max_concurrent.max(1);
    let chunk_count = pairs.len().div_ceil(chunk_size);
    let mut results = Vec::with_capacity(pairs.len());

    for (index, chunk) in pairs.chunks(chunk_size).enumerate() {
        debug!(chunk = index + 1, of = chunk_count, size = chunk.len(), "Comparing chunk");

        let outcomes = join_all(chunk.iter().map(|(a, b)| comparator.compare(a, b))).await;

        for (&(a, b), outcome) in chunk.iter().zip(outcomes) {
            if let ComparisonOutcome::Failed { reason } = &outcome {
                warn!(
                    a = %a.url_hash,
                    b = %b.url_hash,
                    error = %reason,
                    "Duplicate comparison failed, treating pair as distinct"
                );
            }
            results.push(PairResult { a, b, outcome });
        }
    }

    results
}
