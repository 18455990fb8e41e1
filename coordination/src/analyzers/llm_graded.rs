//! LLM-graded analyzer: issues a single structured
//! request and parses a JSON verdict; falls back to the rule-based
//! analyzer on any failure. Execute-gate threshold: 65.

use serde::{Deserialize, Serialize};

pub const LLM_GRADED_EXECUTE_THRESHOLD: f64 = 65.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Execute,
    Review,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
struct RawVerdict {
    semantic_similarity: serde_json::Value,
    approach_agreement: serde_json::Value,
    conflicts: serde_json::Value,
    key_agreements: serde_json::Value,
    recommendation: serde_json::Value,
    reasoning: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmGradedAnalysis {
    pub consensus_score: f64,
    pub semantic_similarity: f64,
    pub approach_agreement: f64,
    pub conflicts: Vec<String>,
    pub key_agreements: Vec<String>,
    pub recommendation: Recommendation,
    pub reasoning: String,
}

fn as_f64_unit(value: &serde_json::Value) -> Option<f64> {
    let n = value.as_f64()?;
    if (0.0..=1.0).contains(&n) {
        Some(n)
    } else {
        None
    }
}

fn as_string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    let arr = value.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(item.as_str()?.to_string());
    }
    Some(out)
}

/// Parses the raw JSON text returned by an LLM grader. Returns `None`
/// on any shape/type mismatch -- required fields missing, wrong types,
/// or `recommendation` outside `{execute, review, reject}` -- so the
/// caller can fall back to the rule-based analyzer.
pub fn parse_llm_response(raw_json: &str) -> Option<LlmGradedAnalysis> {
    let raw: RawVerdict = serde_json::from_str(raw_json).ok()?;

    let semantic_similarity = as_f64_unit(&raw.semantic_similarity)?;
    let approach_agreement = as_f64_unit(&raw.approach_agreement)?;
    let conflicts = as_string_list(&raw.conflicts)?;
    let key_agreements = as_string_list(&raw.key_agreements)?;
    let reasoning = raw.reasoning.as_str()?.to_string();

    let recommendation = match raw.recommendation.as_str()? {
        "execute" => Recommendation::Execute,
        "review" => Recommendation::Review,
        "reject" => Recommendation::Reject,
        _ => return None,
    };

    let consensus_score = (semantic_similarity * 50.0 + approach_agreement * 40.0
        - (conflicts.len() as f64 * 5.0).min(30.0))
    .clamp(0.0, 100.0);

    Some(LlmGradedAnalysis {
        consensus_score,
        semantic_similarity,
        approach_agreement,
        conflicts,
        key_agreements,
        recommendation,
        reasoning,
    })
}

/// Runs the LLM-graded analysis over an already-obtained raw response
/// string, falling back to `None` (caller falls back to rule-based) on
/// any parse failure. Naming mirrors the reference's
/// `_calculate_consensus_score`/`_parse_llm_response` split: parsing
/// and scoring happen together here since the score is derived purely
/// from the parsed fields.
pub fn llm_graded_analysis(raw_json: &str) -> Option<LlmGradedAnalysis> {
    parse_llm_response(raw_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verdict() {
        let json = r#"{
            "semantic_similarity": 0.9,
            "approach_agreement": 0.85,
            "conflicts": ["minor naming disagreement"],
            "key_agreements": ["both agree on the API shape"],
            "recommendation": "execute",
            "reasoning": "Both proposals converge on the same design."
        }"#;
        let verdict = parse_llm_response(json).unwrap();
        assert_eq!(verdict.recommendation, Recommendation::Execute);
        assert_eq!(verdict.conflicts.len(), 1);
        let expected = (0.9 * 50.0 + 0.85 * 40.0 - 5.0).clamp(0.0, 100.0);
        assert!((verdict.consensus_score - expected).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_recommendation_value() {
        let json = r#"{
            "semantic_similarity": 0.5,
            "approach_agreement": 0.5,
            "conflicts": [],
            "key_agreements": [],
            "recommendation": "maybe",
            "reasoning": "unclear"
        }"#;
        assert!(parse_llm_response(json).is_none());
    }

    #[test]
    fn rejects_out_of_range_similarity() {
        let json = r#"{
            "semantic_similarity": 1.5,
            "approach_agreement": 0.5,
            "conflicts": [],
            "key_agreements": [],
            "recommendation": "execute",
            "reasoning": "bad data"
        }"#;
        assert!(parse_llm_response(json).is_none());
    }

    #[test]
    fn rejects_missing_required_field() {
        let json = r#"{"semantic_similarity": 0.5, "recommendation": "execute"}"#;
        assert!(parse_llm_response(json).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_llm_response("not json at all").is_none());
    }

    #[test]
    fn many_conflicts_caps_the_penalty_at_thirty() {
        let conflicts: Vec<String> = (0..10).map(|i| format!("conflict {i}")).collect();
        let json = serde_json::json!({
            "semantic_similarity": 1.0,
            "approach_agreement": 1.0,
            "conflicts": conflicts,
            "key_agreements": [],
            "recommendation": "reject",
            "reasoning": "many conflicts"
        })
        .to_string();
        let verdict = parse_llm_response(&json).unwrap();
        assert_eq!(verdict.consensus_score, 60.0);
    }
}
