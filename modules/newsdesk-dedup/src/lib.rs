//! Cross-source semantic deduplication for collected news articles.
//!
//! Articles are bucketed by publication time, every pair inside a bucket is
//! put to an LLM "same story?" oracle, confirmed pairs are folded into
//! transitive clusters, and each cluster elects one canonical article.

pub mod cluster;
pub mod comparison;
pub mod detector;
pub mod emitter;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod temporal;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod union_find;

pub use comparison::{Comparator, ComparisonOutcome, PairJudgment};
pub use detector::{DetectionResult, DetectionStats, DuplicateDetector};
pub use runner::run_dedup_pass;
pub use store::{DuplicateStore, PgDuplicateStore};
