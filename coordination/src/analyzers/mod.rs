//! Rule-based and semantic analyzers, used by the
//! enforcement/session-protocol side to compare two free-form
//! proposals without relying on per-participant self-scoring.

mod llm_graded;
mod rule_based;

pub use llm_graded::{llm_graded_analysis, LlmGradedAnalysis, Recommendation};
pub use rule_based::rule_based_consensus;
