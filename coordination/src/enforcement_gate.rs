//! Enforcement gate: decides whether a code change needs
//! a debate, and blocks execution until a session reaches consensus or
//! the user explicitly overrides it (the override is terminal
//! once set, never automatically cleared).

use serde::{Deserialize, Serialize};

use crate::config::DebateConfig;
use crate::error::DebateResult;
use crate::session::{SessionMetadata, SessionState, SessionStore};

const ARCHITECTURAL_KEYWORDS: &[&str] = &[
    "refactor",
    "redesign",
    "migrate",
    "architecture",
    "authentication",
    "authorization",
    "security",
    "database",
    "api",
    "schema",
    "jwt",
    "token",
    "caching",
    "cache",
    "workflow",
    "approval",
    "integration",
    "service",
    "infrastructure",
    "deployment",
];

const SCOPE_KEYWORDS: &[&str] = &[
    "system-wide",
    "all",
    "entire",
    "multiple",
    "cross-cutting",
    "implement",
    "new feature",
    "add new",
];

const SIMPLE_KEYWORDS: &[&str] = &["typo", "fix", "comment", "documentation", "readme"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRequirement {
    pub required: bool,
    pub complexity_score: u8,
    pub reason: String,
}

fn calculate_complexity(request: &str, file_count: usize) -> u8 {
    let mut score: i64 = match file_count {
        0 => 5,
        1 => 10,
        2..=3 => 15,
        _ => 20,
    };

    let request_lower = request.to_lowercase();

    let keyword_matches = ARCHITECTURAL_KEYWORDS
        .iter()
        .filter(|kw| request_lower.contains(*kw))
        .count();
    score += (keyword_matches as i64 * 12).min(50);

    let scope_matches = SCOPE_KEYWORDS.iter().filter(|kw| request_lower.contains(*kw)).count();
    score += (scope_matches as i64 * 12).min(25);

    if request_lower.contains("add ") && ARCHITECTURAL_KEYWORDS.iter().any(|kw| request_lower.contains(kw)) {
        score += 5;
    }

    let simple_matches = SIMPLE_KEYWORDS.iter().filter(|kw| request_lower.contains(*kw)).count();
    if simple_matches > 0 {
        score = (score - 30).max(0);
    }

    score.min(100) as u8
}

/// Decides whether `request` (touching `file_paths`) needs a debate,
/// per a keyword/file-count complexity heuristic.
pub fn check_debate_required(config: &DebateConfig, request: &str, file_paths: &[String]) -> DebateRequirement {
    if !config.enabled {
        return DebateRequirement {
            required: false,
            complexity_score: 0,
            reason: "AI debate system is disabled".to_string(),
        };
    }

    let complexity_score = calculate_complexity(request, file_paths.len());
    let required = complexity_score >= config.complexity_threshold;
    let reason = if required {
        format!(
            "Complexity score {complexity_score} >= threshold {}",
            config.complexity_threshold
        )
    } else {
        format!(
            "Complexity score {complexity_score} < threshold {}",
            config.complexity_threshold
        )
    };

    DebateRequirement {
        required,
        complexity_score,
        reason,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPackStub {
    pub summary: String,
    pub current_round: u32,
    pub max_rounds: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub can_execute: bool,
    pub consensus_score: Option<f64>,
    pub user_override: bool,
    pub decision_pack: Option<DecisionPackStub>,
    pub error: Option<String>,
}

/// Checks a session's state and decides whether execution may proceed:
/// consensus reached or a standing user override both allow it; an
/// unresolved escalation or an in-progress debate both block it.
pub fn block_execution_until_consensus(
    config: &DebateConfig,
    store: &SessionStore,
    session_id: &str,
    max_rounds: u8,
) -> GateDecision {
    if !config.enabled {
        return GateDecision {
            can_execute: true,
            consensus_score: None,
            user_override: false,
            decision_pack: None,
            error: None,
        };
    }

    let metadata: SessionMetadata = match store.read_metadata(session_id) {
        Ok(m) => m,
        Err(e) => {
            return GateDecision {
                can_execute: false,
                consensus_score: None,
                user_override: false,
                decision_pack: None,
                error: Some(e.to_string()),
            }
        }
    };

    match metadata.state {
        SessionState::Consensus => GateDecision {
            can_execute: true,
            consensus_score: metadata.consensus_score,
            user_override: false,
            decision_pack: None,
            error: None,
        },
        SessionState::Escalation if metadata.user_override => GateDecision {
            can_execute: true,
            consensus_score: metadata.consensus_score,
            user_override: true,
            decision_pack: None,
            error: None,
        },
        SessionState::Escalation => GateDecision {
            can_execute: false,
            consensus_score: metadata.consensus_score,
            user_override: false,
            decision_pack: Some(DecisionPackStub {
                summary: "AIs could not reach consensus".to_string(),
                current_round: metadata.current_round,
                max_rounds,
            }),
            error: None,
        },
        _ => GateDecision {
            can_execute: false,
            consensus_score: metadata.consensus_score,
            user_override: false,
            decision_pack: Some(DecisionPackStub {
                summary: format!("Debate in progress (state: {})", metadata.state),
                current_round: metadata.current_round,
                max_rounds,
            }),
            error: None,
        },
    }
}

/// Sets the session's terminal user-override flag: once set,
/// [`block_execution_until_consensus`] allows execution from an
/// escalated state without ever clearing it automatically.
pub fn mark_user_override(store: &SessionStore, session_id: &str) -> DebateResult<()> {
    store.mark_user_override(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config() -> DebateConfig {
        let mut cfg = DebateConfig::default();
        cfg.enabled = true;
        cfg.complexity_threshold = 40;
        cfg
    }

    #[test]
    fn typo_fix_is_low_complexity() {
        let req = check_debate_required(&config(), "Fix typo in README", &[]);
        assert!(!req.required);
        assert!(req.complexity_score < 40);
    }

    #[test]
    fn auth_refactor_is_high_complexity() {
        let req = check_debate_required(&config(), "Refactor authentication to use JWT", &[]);
        assert!(req.required);
        assert!(req.complexity_score >= 40);
    }

    #[test]
    fn disabled_config_never_requires_debate() {
        let mut cfg = config();
        cfg.enabled = false;
        let req = check_debate_required(&cfg, "Redesign the entire authentication architecture", &[]);
        assert!(!req.required);
        assert_eq!(req.complexity_score, 0);
    }

    #[test]
    fn consensus_state_allows_execution() {
        let tmp = tempdir().unwrap();
        let store = SessionStore::new(tmp.path().to_path_buf(), Duration::from_secs(1));
        store.create_session("s1").unwrap();
        let mut meta = store.read_metadata("s1").unwrap();
        meta.state = SessionState::Consensus;
        meta.consensus_score = Some(92.0);
        store.write_metadata("s1", &meta).unwrap();

        let decision = block_execution_until_consensus(&config(), &store, "s1", 5);
        assert!(decision.can_execute);
        assert_eq!(decision.consensus_score, Some(92.0));
    }

    #[test]
    fn escalation_without_override_blocks_and_returns_pack() {
        let tmp = tempdir().unwrap();
        let store = SessionStore::new(tmp.path().to_path_buf(), Duration::from_secs(1));
        store.create_session("s1").unwrap();
        let mut meta = store.read_metadata("s1").unwrap();
        meta.state = SessionState::Escalation;
        store.write_metadata("s1", &meta).unwrap();

        let decision = block_execution_until_consensus(&config(), &store, "s1", 5);
        assert!(!decision.can_execute);
        assert!(decision.decision_pack.is_some());
    }

    #[test]
    fn escalation_with_override_allows_execution() {
        let tmp = tempdir().unwrap();
        let store = SessionStore::new(tmp.path().to_path_buf(), Duration::from_secs(1));
        store.create_session("s1").unwrap();
        let mut meta = store.read_metadata("s1").unwrap();
        meta.state = SessionState::Escalation;
        store.write_metadata("s1", &meta).unwrap();

        mark_user_override(&store, "s1").unwrap();
        let decision = block_execution_until_consensus(&config(), &store, "s1", 5);
        assert!(decision.can_execute);
        assert!(decision.user_override);
    }
}
