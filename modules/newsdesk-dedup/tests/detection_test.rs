//! End-to-end detection over a scripted oracle.
//!
//! No network or database: MockOracle answers every comparison from a
//! table keyed by the two titles in the prompt.

use std::collections::HashSet;
use std::sync::Arc;

use newsdesk_common::{Article, DedupSettings, PromptRegistry};
use newsdesk_dedup::testing::{article_at, article_titled, hours_after_base, MockOracle};
use newsdesk_dedup::{DetectionResult, DuplicateDetector};

const TESLA_REUTERS: &str = "Tesla Q4 earnings beat Wall Street estimates";
const TESLA_BLOOMBERG: &str = "Tesla posts record fourth-quarter profit";
const TESLA_CNBC: &str = "Tesla stock jumps after Q4 earnings report";
const BANK_MERGER: &str = "Swiss bank merger approved by regulators";

fn detector(oracle: Arc<MockOracle>) -> DuplicateDetector {
    detector_with(oracle, DedupSettings::default())
}

fn detector_with(oracle: Arc<MockOracle>, settings: DedupSettings) -> DuplicateDetector {
    DuplicateDetector::new(oracle, settings, PromptRegistry::builtin())
        .expect("default settings are valid")
}

fn newsroom() -> Vec<Article> {
    vec![
        article_titled("reuters-tesla", TESLA_REUTERS, "Reuters", 2, 0),
        article_titled("bloomberg-tesla", TESLA_BLOOMBERG, "Bloomberg", 2, 1),
        article_titled("cnbc-tesla", TESLA_CNBC, "CNBC", 3, 2),
        article_titled("ft-bank", BANK_MERGER, "Financial Times", 1, 5),
    ]
}

fn tesla_oracle() -> MockOracle {
    MockOracle::new()
        .with_default(false, 0.1)
        .on_pair(TESLA_REUTERS, TESLA_BLOOMBERG, true, 0.92)
        .on_pair(TESLA_REUTERS, TESLA_CNBC, true, 0.88)
        .on_pair(TESLA_BLOOMBERG, TESLA_CNBC, true, 0.86)
}

fn assert_partition(result: &DetectionResult) {
    let mut seen = HashSet::new();
    for group in &result.groups {
        assert!(
            !group.duplicate_url_hashes.contains(&group.canonical_url_hash),
            "canonical {} listed as its own duplicate",
            group.canonical_url_hash
        );
        assert!(seen.insert(group.canonical_url_hash.clone()));
        for hash in &group.duplicate_url_hashes {
            assert!(seen.insert(hash.clone()), "{hash} appears in two groups");
        }
    }
}

#[tokio::test]
async fn same_story_from_three_wires_collapses_to_one_group() {
    let oracle = Arc::new(tesla_oracle());

    let result = detector(oracle.clone()).detect_duplicates(&newsroom()).await;

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.canonical_url_hash, "reuters-tesla");
    assert_eq!(
        group.duplicate_url_hashes,
        vec!["bloomberg-tesla", "cnbc-tesla"]
    );
    assert_eq!(group.member_count(), 3);
    let expected = (0.92 + 0.88 + 0.86) / 3.0;
    assert!((group.confidence - expected).abs() < 1e-9);

    assert_eq!(
        result.duplicate_ids,
        HashSet::from(["bloomberg-tesla".to_string(), "cnbc-tesla".to_string()])
    );
    assert!(!result.duplicate_ids.contains("ft-bank"));
    assert!(!group.contains("ft-bank"));

    // One temporal group of four: every pair asked exactly once
    assert_eq!(oracle.calls(), 6);
    assert_eq!(result.stats.pairs_scheduled, 6);
    assert_eq!(result.stats.confirmed_edges, 3);
}

#[tokio::test]
async fn below_threshold_everywhere_yields_nothing() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.50));

    let result = detector(oracle.clone()).detect_duplicates(&newsroom()).await;

    assert!(result.groups.is_empty());
    assert!(result.duplicate_ids.is_empty());
    assert_eq!(oracle.calls(), 6);
    assert_eq!(result.stats.confirmed_edges, 0);
}

#[tokio::test]
async fn articles_beyond_window_are_never_compared() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.99));
    let articles = vec![
        article_at("monday", "Reuters", 2, 0),
        article_at("thursday", "Bloomberg", 2, 72),
    ];

    let result = detector(oracle.clone()).detect_duplicates(&articles).await;

    assert!(result.is_empty());
    assert_eq!(oracle.calls(), 0);
    assert_eq!(result.stats.temporal_groups, 0);
}

#[tokio::test]
async fn zero_or_one_article_makes_no_calls() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.99));
    let detector = detector(oracle.clone());

    let empty = detector.detect_duplicates(&[]).await;
    let single = detector
        .detect_duplicates(&[article_at("only", "Reuters", 2, 0)])
        .await;

    assert!(empty.is_empty() && empty.duplicate_ids.is_empty());
    assert!(single.is_empty() && single.duplicate_ids.is_empty());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn chaining_is_anchored_on_the_first_article() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.95));
    let articles = vec![
        article_at("a", "Reuters", 2, 0),
        article_at("b", "Bloomberg", 2, 40),
        article_at("c", "CNBC", 3, 75),
    ];

    let result = detector(oracle.clone()).detect_duplicates(&articles).await;

    assert_eq!(oracle.calls(), 1);
    assert!(oracle.was_compared("Story a", "Story b"));
    assert!(!oracle.was_compared("Story b", "Story c"));
    assert!(!oracle.was_compared("Story a", "Story c"));

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].canonical_url_hash, "a");
    assert_eq!(result.groups[0].duplicate_url_hashes, vec!["b"]);
    assert!(!result.duplicate_ids.contains("c"));
}

#[tokio::test]
async fn transitive_links_merge_even_when_direct_pair_is_rejected() {
    let oracle = Arc::new(
        MockOracle::new()
            .on_pair("Story a", "Story b", true, 0.9)
            .on_pair("Story b", "Story c", true, 0.8)
            .on_pair("Story a", "Story c", false, 0.3),
    );
    let articles = vec![
        article_at("a", "Reuters", 2, 0),
        article_at("b", "Bloomberg", 2, 1),
        article_at("c", "CNBC", 3, 2),
    ];

    let result = detector(oracle).detect_duplicates(&articles).await;

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].duplicate_url_hashes, vec!["b", "c"]);
    // Mean of the two confirmed pairs only
    assert!((result.groups[0].confidence - 0.85).abs() < 1e-9);
}

#[tokio::test]
async fn failed_comparison_only_loses_its_own_edge() {
    let oracle = Arc::new(
        MockOracle::new()
            .on_pair("Story a", "Story b", true, 0.9)
            .on_error("Story a", "Story c", "overloaded")
            .on_raw("Story b", "Story c", serde_json::json!({"verdict": "yes"})),
    );
    let articles = vec![
        article_at("a", "Reuters", 2, 0),
        article_at("b", "Bloomberg", 2, 1),
        article_at("c", "CNBC", 3, 2),
    ];

    let result = detector(oracle).detect_duplicates(&articles).await;

    assert_eq!(result.stats.pairs_failed, 2);
    assert_eq!(result.stats.pairs_judged, 1);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].duplicate_url_hashes, vec!["b"]);
    assert!(!result.duplicate_ids.contains("c"));
}

#[tokio::test]
async fn every_comparison_failing_is_an_empty_result() {
    let oracle = Arc::new(MockOracle::new().with_default_error("connection refused"));

    let result = detector(oracle.clone()).detect_duplicates(&newsroom()).await;

    assert!(result.is_empty());
    assert!(result.duplicate_ids.is_empty());
    assert_eq!(oracle.calls(), 6);
    assert_eq!(result.stats.pairs_failed, 6);
}

#[tokio::test]
async fn two_stories_in_one_window_form_disjoint_groups() {
    let oracle = Arc::new(
        MockOracle::new()
            .with_default(false, 0.05)
            .on_pair("Story s1", "Story s2", true, 0.9)
            .on_pair("Story s1", "Story s3", true, 0.9)
            .on_pair("Story s2", "Story s3", true, 0.9)
            .on_pair("Story t1", "Story t2", true, 0.8),
    );
    let articles = vec![
        article_at("s1", "Reuters", 2, 0),
        article_at("t1", "AP", 1, 1),
        article_at("s2", "Bloomberg", 2, 2),
        article_at("t2", "CNBC", 3, 3),
        article_at("s3", "Blog", 5, 4),
        article_at("lone", "FT", 2, 5),
    ];

    let result = detector(oracle).detect_duplicates(&articles).await;

    assert_eq!(result.groups.len(), 2);
    assert_partition(&result);
    // Ordered by canonical preference: AP (priority 1) before Reuters
    assert_eq!(result.groups[0].canonical_url_hash, "t1");
    assert_eq!(result.groups[1].canonical_url_hash, "s1");
    assert_eq!(result.duplicate_ids.len(), 3);
    assert!(!result.duplicate_ids.contains("lone"));
}

#[tokio::test]
async fn input_order_does_not_change_the_outcome() {
    let forward = newsroom();
    let mut reversed = newsroom();
    reversed.reverse();

    let a = detector(Arc::new(tesla_oracle()))
        .detect_duplicates(&forward)
        .await;
    let b = detector(Arc::new(tesla_oracle()))
        .detect_duplicates(&reversed)
        .await;

    assert_eq!(a.groups.len(), b.groups.len());
    for (x, y) in a.groups.iter().zip(&b.groups) {
        assert_eq!(x.canonical_url_hash, y.canonical_url_hash);
        assert_eq!(x.duplicate_url_hashes, y.duplicate_url_hashes);
        assert!((x.confidence - y.confidence).abs() < 1e-9);
    }
    assert_eq!(a.duplicate_ids, b.duplicate_ids);
}

#[tokio::test]
async fn publication_time_wins_over_collection_time() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.9));
    // Collected late, but published before the other article
    let mut early_published = article_at("published-early", "Bloomberg", 2, 10);
    early_published.published_at = Some(hours_after_base(-1));
    let articles = vec![early_published, article_at("collected-first", "Reuters", 2, 0)];

    let result = detector(oracle).detect_duplicates(&articles).await;

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].canonical_url_hash, "published-early");
}

#[tokio::test]
async fn narrower_window_splits_groups() {
    let oracle = Arc::new(MockOracle::new().with_default(true, 0.9));
    let settings = DedupSettings {
        time_window_hours: 6,
        ..Default::default()
    };
    let articles = vec![
        article_at("a", "Reuters", 2, 0),
        article_at("b", "Bloomberg", 2, 6),
        article_at("c", "CNBC", 3, 7),
    ];

    let result = detector_with(oracle.clone(), settings)
        .detect_duplicates(&articles)
        .await;

    // 6h boundary is inclusive; c restarts a singleton group
    assert_eq!(oracle.calls(), 1);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].duplicate_url_hashes, vec!["b"]);
}

#[tokio::test]
async fn oracle_requests_are_tagged_and_deterministic() {
    let oracle = Arc::new(MockOracle::new().with_default(false, 0.1));
    let articles = vec![
        article_titled("a", TESLA_REUTERS, "Reuters", 2, 0),
        article_titled("b", BANK_MERGER, "Financial Times", 1, 1),
    ];

    detector(oracle.clone()).detect_duplicates(&articles).await;

    let requests = oracle.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tag.module, "deduplication");
    assert_eq!(requests[0].tag.request_type, "duplicate_check");
    assert_eq!(requests[0].temperature, 0.0);
    let user = &requests[0].messages.last().expect("user turn").content;
    assert!(user.contains("Source: Reuters"));
    assert!(user.contains("2026-01-05 00:00 UTC"));
}
