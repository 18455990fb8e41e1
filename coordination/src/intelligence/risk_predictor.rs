//! Risk predictor: ranks cached patterns by relevance to a
//! new request and derives a should-proceed verdict.

use serde::{Deserialize, Serialize};

use super::pattern_detector::{Pattern, PatternType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedRisk {
    pub name: String,
    pub probability: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub risks: Vec<PredictedRisk>,
    pub should_proceed: bool,
    pub confidence: f64,
}

fn relevance(pattern: &Pattern, request: &str, file_size: Option<usize>) -> f64 {
    let mut score = 0.0;
    let request_lower = request.to_lowercase();
    let pattern_tokens: Vec<&str> = pattern.name.split(|c| c == ':' || c == '+').collect();
    let overlap = pattern_tokens
        .iter()
        .filter(|t| !t.is_empty() && request_lower.contains(&t.to_lowercase()))
        .count();
    score += overlap as f64 * 20.0;

    if let Some(size) = file_size {
        let bucket = if size < 500 {
            "small"
        } else if size <= 1500 {
            "medium"
        } else {
            "large"
        };
        if pattern.pattern_type == PatternType::FilePattern && pattern.name.ends_with(bucket) {
            score += 20.0;
        }
    }
    score.min(100.0)
}

fn severity_for(average_consensus: f64) -> Severity {
    if average_consensus < 50.0 {
        Severity::High
    } else if average_consensus < 75.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Computes per-risk probability and an overall should-proceed
/// verdict from the cached pattern set. Probability formula:
/// `0.4*min(freq/10,1) + 0.3*(1-success_rate) + 0.3*min(relevance/100,1)`.
pub fn predict_risk(patterns: &[Pattern], request: &str, file_size: Option<usize>) -> RiskPrediction {
    let mut risks = Vec::new();
    for pattern in patterns.iter().filter(|p| p.pattern_type == PatternType::Risk) {
        let rel = relevance(pattern, request, file_size);
        let probability = 0.4 * (pattern.frequency as f64 / 10.0).min(1.0)
            + 0.3 * (1.0 - pattern.success_rate)
            + 0.3 * (rel / 100.0).min(1.0);
        risks.push(PredictedRisk {
            name: pattern.name.clone(),
            probability: probability.clamp(0.0, 1.0),
            severity: severity_for(pattern.average_consensus),
        });
    }
    risks.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap());

    let confidence = if patterns.is_empty() {
        0.0
    } else {
        (patterns.len() as f64 / 10.0).min(1.0)
    };

    let high_risk_exceeds_threshold = risks
        .iter()
        .any(|r| matches!(r.severity, Severity::High) && r.probability > 0.7);
    let should_proceed = !(high_risk_exceeds_threshold && confidence > 0.6);

    RiskPrediction {
        risks,
        should_proceed,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(name: &str, frequency: usize, success_rate: f64, avg_consensus: f64) -> Pattern {
        Pattern {
            pattern_type: PatternType::Risk,
            name: name.to_string(),
            frequency,
            average_consensus: avg_consensus,
            success_rate,
            priority_score: 0.0,
        }
    }

    #[test]
    fn high_frequency_low_success_high_severity_blocks_proceed() {
        let patterns = vec![pattern("risk:security", 10, 0.0, 20.0); 3];
        let prediction = predict_risk(&patterns, "security review", Some(1000));
        assert!(!prediction.should_proceed);
        assert!(prediction.confidence > 0.6);
    }

    #[test]
    fn low_frequency_high_success_allows_proceed() {
        let patterns = vec![pattern("risk:memory", 1, 0.9, 90.0)];
        let prediction = predict_risk(&patterns, "memory tweak", Some(100));
        assert!(prediction.should_proceed);
    }

    #[test]
    fn empty_patterns_yields_zero_confidence_and_proceed() {
        let prediction = predict_risk(&[], "anything", None);
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.should_proceed);
    }

    #[test]
    fn probabilities_are_sorted_descending() {
        let patterns = vec![
            pattern("risk:a", 1, 0.9, 90.0),
            pattern("risk:b", 10, 0.1, 20.0),
        ];
        let prediction = predict_risk(&patterns, "a b", Some(100));
        assert!(prediction.risks[0].probability >= prediction.risks[1].probability);
    }
}
