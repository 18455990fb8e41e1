//! Adversarial two-LLM debate pipeline.
//!
//! Two independent adapters critique the same plan or diff
//! concurrently; a deterministic fast moderator and a pair of
//! pluggable analyzers turn their raw responses into a consensus
//! score. Sessions are coordinated on disk with advisory locks so
//! multiple processes can drive the same debate without stepping on
//! each other. A history store and intelligence layer learn from past
//! outcomes to steer future debates, and an iterative engine can drive
//! a plan file toward a target consensus by revising and re-debating
//! automatically.
//!
//! # Usage
//!
//! ```bash
//! # Run a single debate round against a plan file
//! debate-coordination debate --file plan.md --request "review this plan"
//!
//! # Iterate revisions until consensus or the round cap is hit
//! debate-coordination iterate --file plan.md --request "review this plan"
//! ```

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod adapter;
pub mod analyzers;
pub mod cache;
pub mod config;
pub mod context_optimizer;
pub mod delta_debate;
pub mod enforcement_gate;
pub mod error;
pub mod history;
pub mod intelligence;
pub mod iterative_engine;
pub mod moderator;
pub mod orchestrator;
pub mod plan_reviser;
pub mod scoring;
pub mod session;

pub use adapter::{AdapterState, AdapterStatus, HttpAdapter, InvokeResponse, LlmAdapter, ProviderRegistry, SubprocessAdapter, SubprocessAdapterConfig};
pub use analyzers::{llm_graded_analysis, rule_based_consensus, LlmGradedAnalysis, Recommendation};
pub use cache::{cache_key, content_hash, CacheEntry, CacheStats, ResponseCache};
pub use config::DebateConfig;
pub use context_optimizer::{extract_excerpt, infer_focus_areas, Excerpt};
pub use delta_debate::{ChangeInfo, ChangedSection, ResolutionCheck};
pub use enforcement_gate::{
    block_execution_until_consensus, check_debate_required, mark_user_override, DebateRequirement,
    GateDecision,
};
pub use error::{DebateError, DebateResult};
pub use history::{DebateRecord, DebateIndex, HistoryStore, Outcome, Statistics};
pub use intelligence::{
    analyze_pre_debate, detect_patterns, enhance_debate_result, learn_rules, predict_risk,
    EnhancedDebateResult, LearnedRule, LearningAdjustments, Pattern, PreDebateAnalysis,
    RiskPrediction,
};
pub use iterative_engine::{run_iterative_debate, IterationKind, IterationRecord, IterativeResult};
pub use moderator::{moderate, ModerationResult, ScoredResponse};
pub use orchestrator::{DebateRunResult, ParallelOrchestrator, ParticipantResult};
pub use plan_reviser::{revise_plan, RevisionResult};
pub use scoring::{
    calculate_fix_time, extract_todos, format_structured, format_todos_as_markdown, group_by_band,
    score_issue, score_issues, summary as todo_summary, Alternative, DecisionPackInput,
    Disagreement, Effort, FixTimes, GroupedIssues, Impact, Issue, PriorityLabel, ScoredIssue,
    Severity, Todo,
};
pub use session::{SessionMetadata, SessionState, SessionStore, WriteResult};
