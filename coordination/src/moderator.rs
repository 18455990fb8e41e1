//! Fast deterministic moderator. Must be reproducible
//! byte-for-byte from its two inputs (modulo wall-time observation).

use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

const DISAGREEMENT_KEYWORDS: &[&str] = &[
    "disagree",
    "concern",
    "however",
    "but",
    "issue",
    "problem",
    "risk",
    "unlike",
];
const AGREEMENT_KEYWORDS: &[&str] = &[
    "agree",
    "good",
    "approve",
    "solid",
    "sound",
    "correct",
    "works well",
];

#[derive(Debug, Clone)]
pub struct ScoredResponse {
    pub score: f64,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResult {
    pub consensus_score: f64,
    pub interpretation: String,
    pub recommendation: String,
    pub score_difference: f64,
    pub disagreements: Vec<String>,
    pub agreements: Vec<String>,
    pub analysis_time_ms: u128,
}

fn split_sentences(text: &str) -> Vec<String> {
    let re = Regex::new(r"[.!?]+").unwrap();
    re.split(text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Collects sentences matching `keywords`, prefixing each with its
/// source label when one is given. Disagreements are labeled so a
/// reader can tell which participant raised them; agreements are not
/// (matching the reference, which only labels disagreements).
fn collect_matches(response: &str, label: Option<&str>, keywords: &[&str], limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    for sentence in split_sentences(response) {
        let lower = sentence.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(kw)) {
            out.push(match label {
                Some(l) => format!("[{l}] {sentence}"),
                None => sentence,
            });
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

pub fn interpret_consensus(score_difference: f64) -> &'static str {
    if score_difference <= 10.0 {
        "Strong Agreement"
    } else if score_difference <= 20.0 {
        "Moderate Agreement"
    } else {
        "Significant Disagreements"
    }
}

pub fn recommendation_for(consensus_score: f64, interpretation: &str, has_stop_ship_issue: bool) -> &'static str {
    if has_stop_ship_issue {
        return "[STOP-SHIP]";
    }
    if consensus_score >= 85.0 {
        if interpretation == "Strong Agreement" {
            "[PROCEED CONFIDENTLY]"
        } else {
            "[PROCEED]"
        }
    } else if consensus_score >= 70.0 {
        "[CAUTION]"
    } else if consensus_score >= 50.0 {
        "[DISCUSS FIRST]"
    } else {
        "[RECONSIDER]"
    }
}

/// Deterministic consensus computation from two scored responses.
/// `has_stop_ship_issue` surfaces whether any pattern issue carries
/// `priority_score >= 85`.
pub fn moderate(
    a: &ScoredResponse,
    b: &ScoredResponse,
    a_label: &str,
    b_label: &str,
    has_stop_ship_issue: bool,
) -> ModerationResult {
    let start = Instant::now();

    let consensus_score = ((a.score + b.score) / 2.0).floor();
    let score_difference = (a.score - b.score).abs();
    let interpretation = interpret_consensus(score_difference).to_string();
    let recommendation =
        recommendation_for(consensus_score, &interpretation, has_stop_ship_issue).to_string();

    let mut disagreements = collect_matches(&a.response, Some(a_label), DISAGREEMENT_KEYWORDS, 5);
    disagreements.extend(collect_matches(&b.response, Some(b_label), DISAGREEMENT_KEYWORDS, 5));
    disagreements.truncate(5);

    let mut agreements = collect_matches(&a.response, None, AGREEMENT_KEYWORDS, 5);
    for sentence in collect_matches(&b.response, None, AGREEMENT_KEYWORDS, 5) {
        if !agreements.contains(&sentence) {
            agreements.push(sentence);
        }
    }
    agreements.truncate(5);

    ModerationResult {
        consensus_score,
        interpretation,
        recommendation,
        score_difference,
        disagreements,
        agreements,
        analysis_time_ms: start.elapsed().as_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_strong_agreement_proceed_confidently() {
        let a = ScoredResponse {
            score: 88.0,
            response: "Agree on plan. Good approach.".to_string(),
        };
        let b = ScoredResponse {
            score: 82.0,
            response: "Good overall. One concern: missing tests.".to_string(),
        };
        let result = moderate(&a, &b, "claude", "codex", false);
        assert_eq!(result.consensus_score, 85.0);
        assert_eq!(result.score_difference, 6.0);
        assert_eq!(result.interpretation, "Strong Agreement");
        assert_eq!(result.recommendation, "[PROCEED CONFIDENTLY]");
        assert!(!result.agreements.is_empty());
        assert!(result.disagreements.iter().any(|d| d.contains("concern")));
    }

    #[test]
    fn perfect_scores_yield_strong_agreement_and_proceed_confidently() {
        let a = ScoredResponse {
            score: 100.0,
            response: "Agree fully.".to_string(),
        };
        let b = ScoredResponse {
            score: 100.0,
            response: "Agree fully.".to_string(),
        };
        let result = moderate(&a, &b, "claude", "codex", false);
        assert_eq!(result.consensus_score, 100.0);
        assert_eq!(result.interpretation, "Strong Agreement");
        assert_eq!(result.recommendation, "[PROCEED CONFIDENTLY]");
    }

    #[test]
    fn stop_ship_issue_overrides_high_consensus() {
        let a = ScoredResponse {
            score: 95.0,
            response: "Looks fine.".to_string(),
        };
        let b = ScoredResponse {
            score: 93.0,
            response: "Looks fine.".to_string(),
        };
        let result = moderate(&a, &b, "claude", "codex", true);
        assert_eq!(result.recommendation, "[STOP-SHIP]");
    }

    #[test]
    fn significant_disagreement_band() {
        let a = ScoredResponse {
            score: 90.0,
            response: "plan is sound".to_string(),
        };
        let b = ScoredResponse {
            score: 60.0,
            response: "however I disagree with this approach".to_string(),
        };
        let result = moderate(&a, &b, "claude", "codex", false);
        assert_eq!(result.interpretation, "Significant Disagreements");
    }

    #[test]
    fn recommendation_bands_descend_monotonically() {
        assert_eq!(recommendation_for(90.0, "Strong Agreement", false), "[PROCEED CONFIDENTLY]");
        assert_eq!(recommendation_for(90.0, "Moderate Agreement", false), "[PROCEED]");
        assert_eq!(recommendation_for(75.0, "Moderate Agreement", false), "[CAUTION]");
        assert_eq!(recommendation_for(55.0, "Moderate Agreement", false), "[DISCUSS FIRST]");
        assert_eq!(recommendation_for(20.0, "Significant Disagreements", false), "[RECONSIDER]");
    }
}
