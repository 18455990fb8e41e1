//! Parallel orchestrator: runs the context optimizer, two
//! independent LLM invocations (through the cache), and the fast
//! moderator, producing a Phase-1 structured debate result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::adapter::LlmAdapter;
use crate::cache::{content_hash, ResponseCache};
use crate::context_optimizer::{self, Excerpt};
use crate::error::{DebateError, DebateResult};
use crate::moderator::{self, ModerationResult, ScoredResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResult {
    pub label: String,
    pub score: f64,
    /// First 200 chars of the raw response.
    pub summary: String,
    pub from_cache: bool,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRunResult {
    pub consensus_score: f64,
    pub interpretation: String,
    pub recommendation: String,
    pub score_difference: f64,
    pub participants: Vec<ParticipantResult>,
    pub disagreements: Vec<String>,
    pub agreements: Vec<String>,
    pub focus_areas: Vec<String>,
    pub file_hash: String,
    pub total_time_ms: u128,
}

fn first_n_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Extracts a numeric score from a free-form LLM response using the
/// small regex set; falls back to `default`.
fn extract_score(text: &str, default: f64) -> f64 {
    let patterns = [
        r"(?i)score\s*[:=]?\s*(\d{1,3})",
        r"(?i)rating\s*[:=]?\s*(\d{1,3})",
        r"(\d{1,3})\s*/\s*100",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(text) {
            if let Ok(n) = caps[1].parse::<f64>() {
                return n.clamp(0.0, 100.0);
            }
        }
    }
    default
}

fn build_primary_prompt(request: &str, excerpt: &Excerpt, focus_areas: &[String]) -> String {
    context_optimizer::create_focused_prompt(request, excerpt, focus_areas)
}

fn build_counter_prompt(request: &str, excerpt: &Excerpt, focus_areas: &[String]) -> String {
    let mut prompt = String::from("You are a critical reviewer. Find flaws, risks, and gaps.\n\n");
    prompt.push_str(&context_optimizer::create_focused_prompt(request, excerpt, focus_areas));
    prompt
}

pub struct ParallelOrchestrator {
    pub cache: Arc<ResponseCache>,
    pub line_budget: Option<usize>,
}

impl ParallelOrchestrator {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self {
            cache,
            line_budget: None,
        }
    }

    /// Invokes `adapter` for `prompt`, consulting the cache first.
    /// Returns `(response_text, score, from_cache, elapsed)`.
    async fn invoke_scored(
        &self,
        adapter: &dyn LlmAdapter,
        prompt: &str,
        file_hash: &str,
        default_score: f64,
    ) -> DebateResult<(String, f64, bool, Duration)> {
        let start = Instant::now();
        if let Some(cached) = self.cache.get(prompt, file_hash) {
            let score = extract_score(&cached, default_score);
            return Ok((cached, score, true, start.elapsed()));
        }

        let response = adapter.invoke(prompt, None).await?;
        self.cache.set(prompt, file_hash, &response.text);
        let score = extract_score(&response.text, default_score);
        Ok((response.text, score, false, start.elapsed()))
    }

    /// Runs one debate round: context extraction, two concurrent
    /// invocations (one per participant slot), cache probing, and
    /// moderation.
    #[instrument(skip(self, first, second, content))]
    pub async fn run_debate(
        &self,
        request: &str,
        content: &str,
        focus_areas: Vec<String>,
        first: (&str, Arc<dyn LlmAdapter>),
        second: (&str, Arc<dyn LlmAdapter>),
        has_stop_ship_issue: bool,
    ) -> DebateResult<DebateRunResult> {
        let start = Instant::now();
        let file_hash = content_hash(content);
        let excerpt = context_optimizer::extract_excerpt(content, &focus_areas, self.line_budget);

        let primary_prompt = build_primary_prompt(request, &excerpt, &focus_areas);
        let counter_prompt = build_counter_prompt(request, &excerpt, &focus_areas);

        let (first_label, first_adapter) = first;
        let (second_label, second_adapter) = second;

        let file_hash_a = file_hash.clone();
        let file_hash_b = file_hash.clone();
        let primary_prompt_owned = primary_prompt.clone();
        let counter_prompt_owned = counter_prompt.clone();

        // The two invocations are independent tasks joined together;
        // neither blocks the other.
        let (first_result, second_result) = tokio::join!(
            self.invoke_scored(first_adapter.as_ref(), &primary_prompt_owned, &file_hash_a, 80.0),
            self.invoke_scored(second_adapter.as_ref(), &counter_prompt_owned, &file_hash_b, 75.0),
        );

        let (first_text, first_score, first_cached, first_elapsed) = first_result?;
        let (second_text, second_score, second_cached, second_elapsed) = second_result?;

        debug!(first_score, second_score, "collected participant scores");

        let moderation: ModerationResult = moderator::moderate(
            &ScoredResponse {
                score: first_score,
                response: first_text.clone(),
            },
            &ScoredResponse {
                score: second_score,
                response: second_text.clone(),
            },
            first_label,
            second_label,
            has_stop_ship_issue,
        );

        let participants = vec![
            ParticipantResult {
                label: first_label.to_string(),
                score: first_score,
                summary: first_n_chars(&first_text, 200),
                from_cache: first_cached,
                elapsed_ms: first_elapsed.as_millis(),
            },
            ParticipantResult {
                label: second_label.to_string(),
                score: second_score,
                summary: first_n_chars(&second_text, 200),
                from_cache: second_cached,
                elapsed_ms: second_elapsed.as_millis(),
            },
        ];

        if moderation.recommendation == "[STOP-SHIP]" {
            warn!("debate concluded with a stop-ship recommendation");
        }

        Ok(DebateRunResult {
            consensus_score: moderation.consensus_score,
            interpretation: moderation.interpretation,
            recommendation: moderation.recommendation,
            score_difference: moderation.score_difference,
            participants,
            disagreements: moderation.disagreements,
            agreements: moderation.agreements,
            focus_areas,
            file_hash,
            total_time_ms: start.elapsed().as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterState, AdapterStatus, InvokeResponse};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StubAdapter {
        vendor: String,
        response: String,
    }

    #[async_trait]
    impl LlmAdapter for StubAdapter {
        fn vendor(&self) -> &str {
            &self.vendor
        }

        async fn invoke(&self, _prompt: &str, _model: Option<&str>) -> DebateResult<InvokeResponse> {
            Ok(InvokeResponse {
                text: self.response.clone(),
                model: "stub".to_string(),
                vendor: self.vendor.clone(),
            })
        }

        async fn state(&self) -> AdapterState {
            AdapterState::Available
        }

        async fn status(&self) -> AdapterStatus {
            AdapterStatus {
                available: true,
                version: None,
                model: "stub".to_string(),
                method: self.vendor.clone(),
                error: None,
            }
        }
    }

    #[test]
    fn extract_score_parses_slash_notation() {
        assert_eq!(extract_score("Looks solid. Score: 92/100", 50.0), 92.0);
    }

    #[test]
    fn extract_score_falls_back_to_default() {
        assert_eq!(extract_score("no numeric signal here", 75.0), 75.0);
    }

    #[tokio::test]
    async fn run_debate_produces_moderated_result() {
        let tmp = tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(tmp.path(), Duration::from_secs(3600)));
        let orchestrator = ParallelOrchestrator::new(cache);

        let claude: Arc<dyn LlmAdapter> = Arc::new(StubAdapter {
            vendor: "claude".to_string(),
            response: "This plan is sound. Score: 90/100".to_string(),
        });
        let codex: Arc<dyn LlmAdapter> = Arc::new(StubAdapter {
            vendor: "codex".to_string(),
            response: "One concern about error handling. Score: 80/100".to_string(),
        });

        let result = orchestrator
            .run_debate(
                "Refactor the error handling module",
                "fn handle() {\n    do_work();\n}\n",
                vec!["refactoring".to_string()],
                ("claude", claude),
                ("codex", codex),
                false,
            )
            .await
            .unwrap();

        assert_eq!(result.consensus_score, 85.0);
        assert_eq!(result.participants.len(), 2);
        assert!(!result.participants[0].from_cache);
    }

    #[tokio::test]
    async fn second_invocation_with_same_prompt_hash_is_served_from_cache() {
        let tmp = tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(tmp.path(), Duration::from_secs(3600)));
        let orchestrator = ParallelOrchestrator::new(cache);
        let adapter: Arc<dyn LlmAdapter> = Arc::new(StubAdapter {
            vendor: "claude".to_string(),
            response: "Fine. Score: 70/100".to_string(),
        });

        let content = "fn a() {}\n";
        let _ = orchestrator
            .run_debate(
                "review this",
                content,
                vec!["refactoring".to_string()],
                ("claude", adapter.clone()),
                ("codex", adapter.clone()),
                false,
            )
            .await
            .unwrap();

        let second = orchestrator
            .run_debate(
                "review this",
                content,
                vec!["refactoring".to_string()],
                ("claude", adapter.clone()),
                ("codex", adapter),
                false,
            )
            .await
            .unwrap();

        assert!(second.participants[0].from_cache);
    }
}
