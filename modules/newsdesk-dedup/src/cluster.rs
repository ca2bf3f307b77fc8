//! Folds confirmed duplicate edges into transitive clusters and elects a
//! canonical article per cluster.
//!
//! Membership is the transitive closure of the edges: A~B and B~C put A, B
//! and C together even if A and C were never compared.

use std::cmp::Ordering;
use std::collections::HashMap;

use newsdesk_common::Article;

use crate::union_find::DisjointSet;

/// A resolved same-story cluster. `duplicates` never contains `canonical`.
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub canonical: &'a Article,
    pub duplicates: Vec<&'a Article>,
    pub confidence: f64,
}

impl Cluster<'_> {
    pub fn size(&self) -> usize {
        self.duplicates.len() + 1
    }
}

/// Canonical preference: most trusted feed first, then earliest effective
/// time, then hash so equal articles still order the same way every run.
pub fn canonical_order(a: &Article, b: &Article) -> Ordering {
    a.feed_priority
        .cmp(&b.feed_priority)
        .then_with(|| a.effective_time().cmp(&b.effective_time()))
        .then_with(|| a.url_hash.cmp(&b.url_hash))
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Default)]
pub struct ClusterBuilder {
    forest: DisjointSet,
    /// Confidence per directly compared, confirmed pair
    confidences: HashMap<(String, String), f64>,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_count(&self) -> usize {
        self.confidences.len()
    }

    /// Record a confirmed duplicate edge.
    pub fn add_edge(&mut self, a: &str, b: &str, confidence: f64) {
        if a == b {
            return;
        }
        self.forest.union(a, b);
        self.confidences.insert(pair_key(a, b), confidence);
    }

    /// Resolve clusters of two or more members. `articles` must contain every
    /// hash passed to [`add_edge`](Self::add_edge); unknown hashes are skipped.
    ///
    /// `fallback_confidence` is used when a cluster has no recorded pair.
    pub fn build<'a>(
        mut self,
        articles: &HashMap<&str, &'a Article>,
        fallback_confidence: f64,
    ) -> Vec<Cluster<'a>> {
        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
        for ((a, _), confidence) in &self.confidences {
            let root = self.forest.find(a).to_string();
            let entry = sums.entry(root).or_insert((0.0, 0));
            entry.0 += confidence;
            entry.1 += 1;
        }

        let mut clusters = Vec::new();
        for members in self.forest.sets() {
            let mut resolved: Vec<&'a Article> = members
                .iter()
                .filter_map(|hash| articles.get(hash.as_str()).copied())
                .collect();
            if resolved.len() < 2 {
                continue;
            }

            resolved.sort_by(|a, b| canonical_order(a, b));
            let canonical = resolved.remove(0);

            let root = self.forest.find(&canonical.url_hash).to_string();
            let confidence = match sums.get(&root) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => fallback_confidence,
            };

            clusters.push(Cluster {
                canonical,
                duplicates: resolved,
                confidence,
            });
        }

        clusters.sort_by(|a, b| canonical_order(a.canonical, b.canonical));
        clusters
    }
}
