// Test mocks for the dedup engine.
//
// - MockOracle (CompletionClient): scripted verdicts keyed by title pair,
//   with call counting, latency injection and an event log
// - MemoryStore (DuplicateStore): in-memory articles/groups/members
//
// Plus article builders anchored on a fixed base time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{Completion, CompletionClient, CompletionRequest, MessageRole, Usage};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use newsdesk_common::{Article, DuplicateGroup};

use crate::store::DuplicateStore;

// ---------------------------------------------------------------------------
// Article builders
// ---------------------------------------------------------------------------

/// 2026-01-05 00:00 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
}

pub fn hours_after_base(hours: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::hours(hours)
}

/// Article collected `hours` after the base time, no published_at.
/// The title is derived from the hash.
pub fn article_at(url_hash: &str, source: &str, feed_priority: i32, hours: i64) -> Article {
    article_titled(
        url_hash,
        &format!("Story {url_hash}"),
        source,
        feed_priority,
        hours,
    )
}

pub fn article_titled(
    url_hash: &str,
    title: &str,
    source: &str,
    feed_priority: i32,
    hours: i64,
) -> Article {
    Article {
        url_hash: url_hash.to_string(),
        title: title.to_string(),
        source: source.to_string(),
        feed_priority,
        published_at: None,
        collected_at: hours_after_base(hours),
    }
}

// ---------------------------------------------------------------------------
// MockOracle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Content(serde_json::Value),
    Error(String),
}

/// Answers dedup comparisons from a script keyed by the unordered pair of
/// article titles found in the user prompt (`Title: ...` lines).
/// Unscripted pairs use the default verdict, or error if none is set.
pub struct MockOracle {
    script: HashMap<(String, String), Scripted>,
    default: Option<Scripted>,
    latency: Option<Duration>,
    pair_latency: HashMap<(String, String), Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Mutex<Vec<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn verdict(is_duplicate: bool, confidence: f64) -> serde_json::Value {
    serde_json::json!({
        "is_duplicate": is_duplicate,
        "confidence": confidence,
        "reason": if is_duplicate { "Same event" } else { "Different events" },
    })
}

/// Titles of article A and B in a rendered comparison prompt.
fn titles(request: &CompletionRequest) -> Result<(String, String)> {
    let user = request
        .messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .ok_or_else(|| anyhow!("MockOracle: request has no user message"))?;
    let found: Vec<&str> = user
        .content
        .lines()
        .filter_map(|line| line.strip_prefix("Title: "))
        .collect();
    match found.as_slice() {
        [a, b] => Ok((a.to_string(), b.to_string())),
        _ => bail!("MockOracle: expected two titles in prompt, found {}", found.len()),
    }
}

impl MockOracle {
    pub const USAGE: Usage = Usage {
        input_tokens: 100,
        output_tokens: 20,
    };

    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            default: None,
            latency: None,
            pair_latency: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn on_pair(mut self, title_a: &str, title_b: &str, is_duplicate: bool, confidence: f64) -> Self {
        self.script.insert(
            key(title_a, title_b),
            Scripted::Content(verdict(is_duplicate, confidence)),
        );
        self
    }

    /// Return arbitrary structured content, e.g. a malformed verdict.
    pub fn on_raw(mut self, title_a: &str, title_b: &str, content: serde_json::Value) -> Self {
        self.script
            .insert(key(title_a, title_b), Scripted::Content(content));
        self
    }

    pub fn on_error(mut self, title_a: &str, title_b: &str, message: &str) -> Self {
        self.script
            .insert(key(title_a, title_b), Scripted::Error(message.to_string()));
        self
    }

    pub fn with_default(mut self, is_duplicate: bool, confidence: f64) -> Self {
        self.default = Some(Scripted::Content(verdict(is_duplicate, confidence)));
        self
    }

    pub fn with_default_error(mut self, message: &str) -> Self {
        self.default = Some(Scripted::Error(message.to_string()));
        self
    }

    /// Delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay one pair, overriding the global latency.
    pub fn on_latency(mut self, title_a: &str, title_b: &str, latency: Duration) -> Self {
        self.pair_latency.insert(key(title_a, title_b), latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `start:<A>|<B>` / `end:<A>|<B>` in the order they happened.
    pub fn event_log(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether the pair was ever asked about, in either order.
    pub fn was_compared(&self, title_a: &str, title_b: &str) -> bool {
        let wanted = key(title_a, title_b);
        self.requests()
            .iter()
            .filter_map(|r| titles(r).ok())
            .any(|(a, b)| key(&a, &b) == wanted)
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockOracle {
    async fn create_completion(&self, request: CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let (a, b) = titles(&request)?;
        let label = format!("{a}|{b}");
        let pair = key(&a, &b);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start:{label}"));

        if let Some(delay) = self.pair_latency.get(&pair).copied().or(self.latency) {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.events.lock().unwrap().push(format!("end:{label}"));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.script.get(&pair).or(self.default.as_ref()) {
            Some(Scripted::Content(content)) => Ok(Completion {
                content: content.clone(),
                usage: Self::USAGE,
            }),
            Some(Scripted::Error(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("MockOracle: no response registered for {label}")),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Article row in the in-memory store.
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub article: Article,
    pub scraped: bool,
    pub processing_complete: bool,
    pub is_duplicate: bool,
    pub canonical_url_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredGroup {
    pub id: Uuid,
    pub canonical_url_hash: String,
    pub confidence: f64,
    pub member_count: usize,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    articles: Vec<StoredArticle>,
    groups: Vec<StoredGroup>,
    members: Vec<(Uuid, String)>,
}

/// Mirrors the Postgres repository: candidates are scraped, processed and
/// not yet flagged; a save applies all groups or none.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ready-to-dedup article.
    pub fn with_article(self, article: Article) -> Self {
        self.with_row(StoredArticle {
            article,
            scraped: true,
            processing_complete: true,
            is_duplicate: false,
            canonical_url_hash: None,
        })
    }

    pub fn with_row(self, row: StoredArticle) -> Self {
        self.state.lock().unwrap().articles.push(row);
        self
    }

    /// Make every save fail before writing anything.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn article(&self, url_hash: &str) -> Option<StoredArticle> {
        self.state
            .lock()
            .unwrap()
            .articles
            .iter()
            .find(|a| a.article.url_hash == url_hash)
            .cloned()
    }

    pub fn groups(&self) -> Vec<StoredGroup> {
        self.state.lock().unwrap().groups.clone()
    }

    pub fn members(&self) -> Vec<(Uuid, String)> {
        self.state.lock().unwrap().members.clone()
    }
}

#[async_trait]
impl DuplicateStore for MemoryStore {
    async fn candidate_articles(&self) -> Result<Vec<Article>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .iter()
            .filter(|a| a.scraped && a.processing_complete && !a.is_duplicate)
            .map(|a| a.article.clone())
            .collect())
    }

    async fn save_duplicate_groups(&self, groups: &[DuplicateGroup]) -> Result<usize> {
        if self.fail_saves {
            bail!("MemoryStore: save failed");
        }

        // Stage on a copy so a missing article leaves nothing half-written
        let mut state = self.state.lock().unwrap();
        let mut staged = MemoryState {
            articles: state.articles.clone(),
            groups: state.groups.clone(),
            members: state.members.clone(),
        };

        let mut flagged = 0;
        for group in groups {
            let id = Uuid::new_v4();
            staged.groups.push(StoredGroup {
                id,
                canonical_url_hash: group.canonical_url_hash.clone(),
                confidence: group.confidence,
                member_count: group.member_count(),
                detected_at: group.detected_at,
            });

            for hash in &group.duplicate_url_hashes {
                staged.members.push((id, hash.clone()));
                let row = staged
                    .articles
                    .iter_mut()
                    .find(|a| &a.article.url_hash == hash)
                    .ok_or_else(|| anyhow!("MemoryStore: unknown article {hash}"))?;
                row.is_duplicate = true;
                row.canonical_url_hash = Some(group.canonical_url_hash.clone());
                flagged += 1;
            }
        }

        *state = staged;
        Ok(flagged)
    }
}
