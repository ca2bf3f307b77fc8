//! One "same story?" question to the oracle and its outcome.

use std::sync::Arc;

use ai_client::util::truncate_to_char_boundary;
use ai_client::{CompletionClient, CompletionRequest, Message, RequestTag, Usage};
use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use newsdesk_common::{Article, PromptArticle, PromptRegistry};

/// Maximum stored length of the oracle's explanation.
pub const MAX_REASON_BYTES: usize = 200;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// The oracle's structured answer for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PairJudgment {
    /// True only if both articles report the same specific event
    pub is_duplicate: bool,
    /// Certainty of the answer, 0.0 to 1.0
    pub confidence: f64,
    /// One short sentence explaining the answer
    pub reason: String,
}

impl PairJudgment {
    fn validated(mut self) -> Result<Self> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(anyhow!("confidence out of range: {}", self.confidence));
        }
        if self.reason.len() > MAX_REASON_BYTES {
            self.reason = truncate_to_char_boundary(&self.reason, MAX_REASON_BYTES).to_string();
        }
        Ok(self)
    }
}

/// Result of comparing one pair. A failed comparison is distinct from a
/// "not duplicate" verdict, but neither produces an edge.
#[derive(Debug, Clone)]
pub enum ComparisonOutcome {
    Judged { judgment: PairJudgment, usage: Usage },
    Failed { reason: String },
}

impl ComparisonOutcome {
    /// Confidence of a confirmed duplicate verdict, if this outcome is one.
    pub fn confirmed_confidence(&self, threshold: f64) -> Option<f64> {
        match self {
            Self::Judged { judgment, .. }
                if judgment.is_duplicate && judgment.confidence >= threshold =>
            {
                Some(judgment.confidence)
            }
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Builds comparison prompts and asks the oracle.
#[derive(Clone)]
pub struct Comparator {
    oracle: Arc<dyn CompletionClient>,
    prompts: PromptRegistry,
}

impl Comparator {
    pub const MODULE: &'static str = "deduplication";
    pub const REQUEST_TYPE: &'static str = "duplicate_check";

    pub fn new(oracle: Arc<dyn CompletionClient>, prompts: PromptRegistry) -> Self {
        Self { oracle, prompts }
    }

    pub fn request(&self, a: &Article, b: &Article) -> CompletionRequest {
        let date_a = a.effective_time().format(DATE_FORMAT).to_string();
        let date_b = b.effective_time().format(DATE_FORMAT).to_string();

        let user = self.prompts.dedup_user_prompt(
            PromptArticle {
                title: &a.title,
                source: &a.source,
                date: &date_a,
            },
            PromptArticle {
                title: &b.title,
                source: &b.source,
                date: &date_b,
            },
        );

        CompletionRequest::structured::<PairJudgment>(
            vec![
                Message::system(self.prompts.dedup_system_prompt()),
                Message::user(user),
            ],
            RequestTag::new(Self::MODULE, Self::REQUEST_TYPE),
        )
        .temperature(0.0)
    }

    /// Compare one pair. Never errors: oracle failures and malformed
    /// responses come back as [`ComparisonOutcome::Failed`].
    pub async fn compare(&self, a: &Article, b: &Article) -> ComparisonOutcome {
        match self.try_compare(a, b).await {
            Ok((judgment, usage)) => ComparisonOutcome::Judged { judgment, usage },
            Err(e) => ComparisonOutcome::Failed {
                reason: format!("{e:#}"),
            },
        }
    }

    async fn try_compare(&self, a: &Article, b: &Article) -> Result<(PairJudgment, Usage)> {
        let completion = self.oracle.create_completion(self.request(a, b)).await?;
        let judgment = completion.parse::<PairJudgment>()?.validated()?;
        Ok((judgment, completion.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article_titled, MockOracle};
    use ai_client::MessageRole;

    fn judged(is_duplicate: bool, confidence: f64) -> ComparisonOutcome {
        ComparisonOutcome::Judged {
            judgment: PairJudgment {
                is_duplicate,
                confidence,
                reason: String::new(),
            },
            usage: Usage::default(),
        }
    }

    #[test]
    fn confirmation_requires_verdict_and_threshold() {
        assert_eq!(judged(true, 0.9).confirmed_confidence(0.75), Some(0.9));
        assert_eq!(judged(true, 0.75).confirmed_confidence(0.75), Some(0.75));
        assert_eq!(judged(true, 0.74).confirmed_confidence(0.75), None);
        assert_eq!(judged(false, 0.99).confirmed_confidence(0.75), None);

        let failed = ComparisonOutcome::Failed {
            reason: "timeout".to_string(),
        };
        assert_eq!(failed.confirmed_confidence(0.0), None);
        assert!(failed.is_failure());
    }

    #[test]
    fn request_shape() {
        let comparator = Comparator::new(Arc::new(MockOracle::new()), PromptRegistry::builtin());
        let a = article_titled("a", "Tesla beats Q4 estimates", "Reuters", 2, 0);
        let b = article_titled("b", "Tesla earnings top forecasts", "Bloomberg", 2, 1);

        let request = comparator.request(&a, &b);

        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.tag.module, "deduplication");
        assert_eq!(request.tag.request_type, "duplicate_check");
        assert_eq!(request.schema_name, "PairJudgment");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[1].role, MessageRole::User);
        assert!(request.messages[1].content.contains("Tesla beats Q4 estimates"));
        assert!(request.messages[1].content.contains("Bloomberg"));
        assert!(request.messages[1].content.contains("2026-01-05 01:00 UTC"));
    }

    #[tokio::test]
    async fn malformed_response_is_a_failure() {
        let oracle = MockOracle::new().on_raw(
            "Tesla beats Q4 estimates",
            "Swiss bank merger",
            serde_json::json!({ "is_duplicate": "maybe" }),
        );
        let comparator = Comparator::new(Arc::new(oracle), PromptRegistry::builtin());
        let a = article_titled("a", "Tesla beats Q4 estimates", "Reuters", 2, 0);
        let b = article_titled("b", "Swiss bank merger", "AP", 1, 3);

        assert!(comparator.compare(&a, &b).await.is_failure());
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_a_failure() {
        let oracle = MockOracle::new().on_pair("A story", "B story", true, 1.4);
        let comparator = Comparator::new(Arc::new(oracle), PromptRegistry::builtin());
        let a = article_titled("a", "A story", "Reuters", 2, 0);
        let b = article_titled("b", "B story", "AP", 1, 1);

        match comparator.compare(&a, &b).await {
            ComparisonOutcome::Failed { reason } => assert!(reason.contains("out of range")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_reason_is_truncated() {
        let oracle = MockOracle::new().on_raw(
            "A story",
            "B story",
            serde_json::json!({
                "is_duplicate": true,
                "confidence": 0.9,
                "reason": "x".repeat(500),
            }),
        );
        let comparator = Comparator::new(Arc::new(oracle), PromptRegistry::builtin());
        let a = article_titled("a", "A story", "Reuters", 2, 0);
        let b = article_titled("b", "B story", "AP", 1, 1);

        match comparator.compare(&a, &b).await {
            ComparisonOutcome::Judged { judgment, .. } => {
                assert_eq!(judgment.reason.len(), MAX_REASON_BYTES)
            }
            other => panic!("expected judgment, got {other:?}"),
        }
    }
}
