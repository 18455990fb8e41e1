//! Decision learner: mines debate records with known
//! outcomes into rules grouped by consensus band, pattern membership,
//! focus tuple, and score-difference band. Each group with at least
//! two samples becomes a rule carrying an observed success rate,
//! sample size, and confidence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::pattern_detector::Pattern;
use super::safe_eval::evaluate_condition;
use crate::history::{DebateRecord, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    ConsensusThreshold,
    PatternSuccess,
    FocusCombination,
    ScoreDifference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedRule {
    pub rule_type: RuleType,
    pub condition: String,
    pub success_rate: f64,
    pub sample_size: usize,
    pub confidence: f64,
}

fn confidence_for(sample_size: usize) -> f64 {
    (sample_size as f64 / 10.0).min(1.0)
}

fn success_rate(records: &[&DebateRecord]) -> f64 {
    let successes = records
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Succeeded))
        .count();
    successes as f64 / records.len() as f64
}

fn consensus_band(score: f64) -> (&'static str, &'static str) {
    if score < 50.0 {
        ("0-50", "consensus >= 0 and consensus < 50")
    } else if score < 70.0 {
        ("50-70", "consensus >= 50 and consensus < 70")
    } else if score < 85.0 {
        ("70-85", "consensus >= 70 and consensus < 85")
    } else {
        ("85-100", "consensus >= 85 and consensus <= 100")
    }
}

fn score_diff_band(diff: f64) -> &'static str {
    if diff < 10.0 {
        "0-10"
    } else if diff < 20.0 {
        "10-20"
    } else {
        "20+"
    }
}

/// Groups `records` with a known (non-`Pending`) outcome by consensus
/// band, pattern membership, focus-area tuple, and score-difference
/// band, emitting one rule per group with at least two samples.
pub fn learn_rules(records: &[DebateRecord], patterns: &[Pattern]) -> Vec<LearnedRule> {
    let known: Vec<&DebateRecord> = records
        .iter()
        .filter(|r| !matches!(r.outcome, Outcome::Pending))
        .collect();
    let mut rules = Vec::new();

    // Consensus-band groups
    let mut bands: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    let mut band_conditions: HashMap<&str, &str> = HashMap::new();
    for record in &known {
        let (name, condition) = consensus_band(record.consensus_score);
        bands.entry(name).or_default().push(record);
        band_conditions.insert(name, condition);
    }
    for (name, group) in &bands {
        if group.len() < 2 {
            continue;
        }
        rules.push(LearnedRule {
            rule_type: RuleType::ConsensusThreshold,
            condition: band_conditions[name].to_string(),
            success_rate: success_rate(group),
            sample_size: group.len(),
            confidence: confidence_for(group.len()),
        });
    }

    // Pattern-membership groups: which debates triggered a detected pattern.
    let mut by_pattern: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    for record in &known {
        for pattern_name in &record.patterns_detected {
            by_pattern
                .entry(pattern_name.as_str())
                .or_default()
                .push(record);
        }
    }
    for pattern in patterns {
        let Some(group) = by_pattern.get(pattern.name.as_str()) else {
            continue;
        };
        if group.len() < 2 {
            continue;
        }
        rules.push(LearnedRule {
            rule_type: RuleType::PatternSuccess,
            condition: format!("pattern == \"{}\"", pattern.name),
            success_rate: success_rate(group),
            sample_size: group.len(),
            confidence: confidence_for(group.len()),
        });
    }

    // Focus-combination groups
    let mut by_focus: HashMap<String, Vec<&DebateRecord>> = HashMap::new();
    for record in &known {
        let mut areas = record.focus_areas.clone();
        areas.sort();
        by_focus.entry(areas.join("+")).or_default().push(record);
    }
    for (tuple, group) in &by_focus {
        if group.len() < 2 {
            continue;
        }
        rules.push(LearnedRule {
            rule_type: RuleType::FocusCombination,
            condition: format!("focus == \"{tuple}\""),
            success_rate: success_rate(group),
            sample_size: group.len(),
            confidence: confidence_for(group.len()),
        });
    }

    // Score-difference bands
    let mut by_diff: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    for record in &known {
        by_diff
            .entry(score_diff_band(record.score_difference))
            .or_default()
            .push(record);
    }
    for (band, group) in &by_diff {
        if group.len() < 2 {
            continue;
        }
        rules.push(LearnedRule {
            rule_type: RuleType::ScoreDifference,
            condition: format!("score_difference == \"{band}\""),
            success_rate: success_rate(group),
            sample_size: group.len(),
            confidence: confidence_for(group.len()),
        });
    }

    rules
}

/// Whether a `ConsensusThreshold` rule's condition applies to a given
/// consensus score. Non-`ConsensusThreshold` rules are matched by
/// plain string equality against their own condition tag at the
/// call site, not through the expression evaluator -- the evaluator
/// is scoped strictly to the `consensus` free variable.
pub fn rule_applies_to_consensus(rule: &LearnedRule, consensus: f64) -> bool {
    rule.rule_type == RuleType::ConsensusThreshold
        && evaluate_condition(&rule.condition, consensus.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn record(consensus: f64, outcome: Outcome, diff: f64, focus: Vec<&str>, patterns: Vec<&str>) -> DebateRecord {
        DebateRecord {
            id: "x".to_string(),
            timestamp: Utc::now(),
            file_path: "f.rs".to_string(),
            content_hash: "h".to_string(),
            file_size: 100,
            request: "r".to_string(),
            focus_areas: focus.into_iter().map(|s| s.to_string()).collect(),
            consensus_score: consensus,
            interpretation: "Strong Agreement".to_string(),
            recommendation: "[PROCEED]".to_string(),
            score_difference: diff,
            participant_scores: Map::new(),
            disagreements: Vec::new(),
            agreements: Vec::new(),
            analysis_time_ms: 1,
            patterns_detected: patterns.into_iter().map(|s| s.to_string()).collect(),
            outcome,
            outcome_notes: None,
        }
    }

    #[test]
    fn ignores_pending_outcomes() {
        let records = vec![record(80.0, Outcome::Pending, 5.0, vec!["bug"], vec![])];
        assert!(learn_rules(&records, &[]).is_empty());
    }

    #[test]
    fn requires_at_least_two_samples_per_group() {
        let records = vec![record(80.0, Outcome::Succeeded, 5.0, vec!["bug"], vec![])];
        assert!(learn_rules(&records, &[]).is_empty());
    }

    #[test]
    fn emits_consensus_threshold_rule_with_correct_success_rate() {
        let records = vec![
            record(80.0, Outcome::Succeeded, 5.0, vec!["bug"], vec![]),
            record(82.0, Outcome::Failed, 6.0, vec!["bug"], vec![]),
        ];
        let rules = learn_rules(&records, &[]);
        let rule = rules
            .iter()
            .find(|r| r.rule_type == RuleType::ConsensusThreshold)
            .unwrap();
        assert_eq!(rule.sample_size, 2);
        assert_eq!(rule.success_rate, 0.5);
        assert_eq!(rule.confidence, 0.2);
    }

    #[test]
    fn consensus_rule_condition_is_evaluable() {
        let records = vec![
            record(80.0, Outcome::Succeeded, 5.0, vec!["bug"], vec![]),
            record(82.0, Outcome::Succeeded, 6.0, vec!["bug"], vec![]),
        ];
        let rules = learn_rules(&records, &[]);
        let rule = rules
            .iter()
            .find(|r| r.rule_type == RuleType::ConsensusThreshold)
            .unwrap();
        assert!(rule_applies_to_consensus(rule, 81.0));
        assert!(!rule_applies_to_consensus(rule, 30.0));
    }

    #[test]
    fn emits_focus_combination_rule() {
        let records = vec![
            record(80.0, Outcome::Succeeded, 5.0, vec!["bug", "security"], vec![]),
            record(60.0, Outcome::Failed, 5.0, vec!["security", "bug"], vec![]),
        ];
        let rules = learn_rules(&records, &[]);
        assert!(rules.iter().any(|r| r.rule_type == RuleType::FocusCombination));
    }
}
