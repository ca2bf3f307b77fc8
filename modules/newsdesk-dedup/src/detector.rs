//! Entry point of the engine: one batch of articles in, duplicate groups out.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ai_client::CompletionClient;
use chrono::Utc;
use tracing::{info, warn};

use newsdesk_common::{Article, DedupSettings, DuplicateGroup, NewsdeskError, PromptRegistry};

use crate::cluster::ClusterBuilder;
use crate::comparison::{Comparator, ComparisonOutcome};
use crate::emitter::emit_groups;
use crate::scheduler::compare_pairs;
use crate::temporal::{candidate_pairs, temporal_groups};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetectionStats {
    pub articles: usize,
    pub temporal_groups: usize,
    pub pairs_scheduled: usize,
    pub pairs_judged: usize,
    pub pairs_failed: usize,
    pub confirmed_edges: usize,
    pub groups: usize,
    pub duplicates: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl fmt::Display for DetectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate detection: {} articles, {} temporal groups, {} pairs ({} judged, {} failed), \
             {} confirmed edges, {} groups, {} duplicates",
            self.articles,
            self.temporal_groups,
            self.pairs_scheduled,
            self.pairs_judged,
            self.pairs_failed,
            self.confirmed_edges,
            self.groups,
            self.duplicates,
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct DetectionResult {
    pub groups: Vec<DuplicateGroup>,
    /// Every non-canonical hash across `groups`.
    pub duplicate_ids: HashSet<String>,
    pub stats: DetectionStats,
}

impl DetectionResult {
    fn empty(stats: DetectionStats) -> Self {
        Self {
            stats,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Cross-source duplicate detection over one batch of articles.
///
/// Stateless between calls: every invocation re-derives groups, edges and
/// clusters from its input and the oracle's answers.
pub struct DuplicateDetector {
    comparator: Comparator,
    settings: DedupSettings,
}

impl DuplicateDetector {
    pub fn new(
        oracle: Arc<dyn CompletionClient>,
        settings: DedupSettings,
        prompts: PromptRegistry,
    ) -> Result<Self, NewsdeskError> {
        settings.validate()?;
        Ok(Self {
            comparator: Comparator::new(oracle, prompts),
            settings,
        })
    }

    pub fn settings(&self) -> &DedupSettings {
        &self.settings
    }

    /// Cluster `articles` into same-story groups.
    ///
    /// Oracle failures never surface here; a failed pair simply contributes
    /// no edge. Fewer than two articles, no temporal group of two, or no
    /// confirmed edge all return an empty result.
    pub async fn detect_duplicates(&self, articles: &[Article]) -> DetectionResult {
        let mut stats = DetectionStats::default();

        let articles = unique_by_hash(articles);
        stats.articles = articles.len();
        if articles.len() < 2 {
            info!(articles = articles.len(), "Too few articles to deduplicate");
            return DetectionResult::empty(stats);
        }

        let owned: Vec<Article> = articles.into_iter().cloned().collect();
        let groups = temporal_groups(&owned, self.settings.time_window());
        stats.temporal_groups = groups.len();

        let pairs = candidate_pairs(&groups);
        stats.pairs_scheduled = pairs.len();
        if pairs.is_empty() {
            info!(articles = stats.articles, "No temporal group with two or more articles");
            return DetectionResult::empty(stats);
        }

        info!(
            articles = stats.articles,
            temporal_groups = stats.temporal_groups,
            pairs = stats.pairs_scheduled,
            max_concurrent = self.settings.max_concurrent,
            "Comparing candidate pairs"
        );

        let results = compare_pairs(&self.comparator, &pairs, self.settings.max_concurrent).await;

        let mut builder = ClusterBuilder::new();
        for result in &results {
            match &result.outcome {
                ComparisonOutcome::Judged { usage, .. } => {
                    stats.pairs_judged += 1;
                    stats.input_tokens += u64::from(usage.input_tokens);
                    stats.output_tokens += u64::from(usage.output_tokens);
                }
                ComparisonOutcome::Failed { .. } => stats.pairs_failed += 1,
            }
            if let Some(confidence) = result
                .outcome
                .confirmed_confidence(self.settings.confidence_threshold)
            {
                builder.add_edge(&result.a.url_hash, &result.b.url_hash, confidence);
            }
        }
        stats.confirmed_edges = builder.edge_count();

        let by_hash: HashMap<&str, &Article> =
            owned.iter().map(|a| (a.url_hash.as_str(), a)).collect();
        let clusters = builder.build(&by_hash, self.settings.confidence_threshold);

        let (groups, duplicate_ids) = emit_groups(&clusters, Utc::now());
        stats.groups = groups.len();
        stats.duplicates = duplicate_ids.len();

        if stats.pairs_failed > 0 && stats.pairs_judged == 0 {
            warn!(failed = stats.pairs_failed, "Every duplicate comparison failed");
        }
        info!(
            input_tokens = stats.input_tokens,
            output_tokens = stats.output_tokens,
            "{stats}"
        );

        DetectionResult {
            groups,
            duplicate_ids,
            stats,
        }
    }
}

/// Drop repeated hashes, keeping the first occurrence.
fn unique_by_hash(articles: &[Article]) -> Vec<&Article> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(articles.len());
    for article in articles {
        if seen.insert(article.url_hash.as_str()) {
            unique.push(article);
        } else {
            warn!(url_hash = %article.url_hash, "Duplicate url_hash in dedup input, ignoring repeat");
        }
    }
    unique
}
