//! Smart recommender: composes the pattern detector, risk
//! predictor, and decision learner into a single pre-debate analysis,
//! and post-debate, steps a debate's recommendation up the severity
//! ladder when the learner supports it.

use serde::{Deserialize, Serialize};

use super::decision_learner::{learn_rules, rule_applies_to_consensus, LearnedRule};
use super::pattern_detector::{detect_patterns, Pattern};
use super::risk_predictor::{predict_risk, RiskPrediction};
use crate::error::{DebateError, DebateResult};
use crate::history::{DebateRecord, Outcome};
use crate::orchestrator::DebateRunResult;

/// Debates with a settled outcome below this count mean there isn't
/// enough signal to recommend anything (see `NotReady`).
const MIN_DEBATES_WITH_OUTCOME: usize = 3;

/// Severity ladder the recommendation is stepped up along.
pub const SEVERITY_LADDER: &[&str] = &[
    "[PROCEED CONFIDENTLY]",
    "[PROCEED]",
    "[CAUTION]",
    "[DISCUSS FIRST]",
    "[RECONSIDER]",
    "[STOP-SHIP]",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreDebateAnalysis {
    pub should_proceed: bool,
    pub confidence: f64,
    pub risk_prediction: RiskPrediction,
    pub pattern_analysis: Vec<Pattern>,
    pub suggested_focus_areas: Vec<String>,
    pub expected_consensus: f64,
    pub estimated_time_ms: u128,
    pub warnings: Vec<String>,
    /// The learned rules available at analysis time -- carried through
    /// so a later `enhance_debate_result` call doesn't need to re-mine
    /// history.
    pub learning_prep: Vec<LearnedRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningAdjustments {
    pub applied_rules: Vec<String>,
    pub severity_change: i32,
    pub adjusted_recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedDebateResult {
    #[serde(flatten)]
    pub result: DebateRunResult,
    pub learning_adjustments: LearningAdjustments,
}

fn suggest_focus_areas(patterns: &[Pattern], fallback: &[String]) -> Vec<String> {
    let mut by_freq: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| p.name.starts_with("focus:"))
        .collect();
    by_freq.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    if let Some(top) = by_freq.first() {
        let areas: Vec<String> = top
            .name
            .trim_start_matches("focus:")
            .split('+')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if !areas.is_empty() {
            return areas;
        }
    }
    fallback.to_vec()
}

fn expected_consensus(patterns: &[Pattern]) -> f64 {
    let consensus_patterns: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| p.name.starts_with("consensus:"))
        .collect();
    if consensus_patterns.is_empty() {
        return 75.0;
    }
    let total_frequency: usize = consensus_patterns.iter().map(|p| p.frequency).sum();
    if total_frequency == 0 {
        return 75.0;
    }
    consensus_patterns
        .iter()
        .map(|p| p.average_consensus * p.frequency as f64)
        .sum::<f64>()
        / total_frequency as f64
}

/// Produces the pre-debate suggestions that seed focus areas,
/// expected consensus, and risk warnings for the next debate round.
/// Returns `NotReady` when fewer than
/// [`MIN_DEBATES_WITH_OUTCOME`] debates have a settled outcome.
pub fn analyze_pre_debate(
    all_records: &[DebateRecord],
    request: &str,
    file_size: Option<usize>,
    fallback_focus: &[String],
) -> DebateResult<PreDebateAnalysis> {
    let settled = all_records
        .iter()
        .filter(|r| !matches!(r.outcome, Outcome::Pending))
        .count();
    if settled < MIN_DEBATES_WITH_OUTCOME {
        return Err(DebateError::not_ready(format!(
            "only {settled} debates with known outcomes; need at least {MIN_DEBATES_WITH_OUTCOME}"
        )));
    }

    let patterns = detect_patterns(all_records);
    let risk_prediction = predict_risk(&patterns, request, file_size);
    let learning_prep = learn_rules(all_records, &patterns);

    let mut warnings = Vec::new();
    for risk in &risk_prediction.risks {
        if risk.probability > 0.5 {
            warnings.push(format!(
                "elevated risk: {} (p={:.2})",
                risk.name, risk.probability
            ));
        }
    }
    if !risk_prediction.should_proceed {
        warnings.push("risk predictor recommends against proceeding without mitigation".to_string());
    }

    Ok(PreDebateAnalysis {
        should_proceed: risk_prediction.should_proceed,
        confidence: risk_prediction.confidence,
        expected_consensus: expected_consensus(&patterns),
        suggested_focus_areas: suggest_focus_areas(&patterns, fallback_focus),
        estimated_time_ms: 30_000,
        warnings,
        risk_prediction,
        pattern_analysis: patterns,
        learning_prep,
    })
}

/// Steps `recommendation` one rung up the severity ladder (toward more
/// caution) `steps` times, clamped at the ladder's ends.
fn step_severity(recommendation: &str, steps: i32) -> String {
    let current = SEVERITY_LADDER
        .iter()
        .position(|r| *r == recommendation)
        .unwrap_or(1);
    let next = (current as i32 + steps).clamp(0, SEVERITY_LADDER.len() as i32 - 1);
    SEVERITY_LADDER[next as usize].to_string()
}

/// Applies the pre-debate analysis's learned rules to a completed
/// debate result, producing a `learning_adjustments` field and, when
/// any applicable rule has a low success rate, stepping the
/// recommendation up the severity ladder.
pub fn enhance_debate_result(
    result: DebateRunResult,
    analysis: &PreDebateAnalysis,
) -> EnhancedDebateResult {
    let mut applied_rules = Vec::new();
    let mut severity_change = 0i32;

    for rule in &analysis.learning_prep {
        if rule_applies_to_consensus(rule, result.consensus_score) {
            applied_rules.push(rule.condition.clone());
            if rule.success_rate < 0.5 && rule.confidence >= 0.3 {
                severity_change += 1;
            }
        }
    }

    let adjusted_recommendation = if severity_change > 0 {
        step_severity(&result.recommendation, severity_change)
    } else {
        result.recommendation.clone()
    };

    EnhancedDebateResult {
        learning_adjustments: LearningAdjustments {
            applied_rules,
            severity_change,
            adjusted_recommendation,
        },
        result,
    }
}
