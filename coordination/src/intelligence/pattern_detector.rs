//! Pattern detector: mines history records into `risk`,
//! `file_pattern`, `focus_pattern`, and `consensus_pattern` entries,
//! each carrying a derived priority score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::history::DebateRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Risk,
    FilePattern,
    FocusPattern,
    ConsensusPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_type: PatternType,
    pub name: String,
    pub frequency: usize,
    pub average_consensus: f64,
    pub success_rate: f64,
    pub priority_score: f64,
}

const RISK_KEYWORDS: &[(&str, &str)] = &[
    ("race condition", "risk:concurrency"),
    ("data loss", "risk:data-integrity"),
    ("security", "risk:security"),
    ("breaking change", "risk:compatibility"),
    ("performance regression", "risk:performance"),
    ("memory leak", "risk:memory"),
];

fn file_size_bucket(size: usize) -> &'static str {
    if size < 500 {
        "small"
    } else if size <= 1500 {
        "medium"
    } else {
        "large"
    }
}

fn consensus_band(score: f64) -> &'static str {
    if score >= 85.0 {
        "85-100"
    } else if score >= 70.0 {
        "70-85"
    } else if score >= 50.0 {
        "50-70"
    } else {
        "0-50"
    }
}

fn priority_score(frequency: usize, success_rate: f64) -> f64 {
    let freq_component = (frequency as f64 / 10.0).min(1.0) * 60.0;
    let failure_component = (1.0 - success_rate) * 40.0;
    (freq_component + failure_component).clamp(0.0, 100.0)
}

fn success_rate_for(records: &[&DebateRecord]) -> f64 {
    let known: Vec<&&DebateRecord> = records
        .iter()
        .filter(|r| !matches!(r.outcome, crate::history::Outcome::Pending))
        .collect();
    if known.is_empty() {
        return 0.5;
    }
    let successes = known
        .iter()
        .filter(|r| matches!(r.outcome, crate::history::Outcome::Succeeded))
        .count();
    successes as f64 / known.len() as f64
}

/// Derives patterns from a slice of debate history. Grounded in
/// `original_source/services/pattern_detector.py`'s four categories.
pub fn detect_patterns(records: &[DebateRecord]) -> Vec<Pattern> {
    let mut patterns = Vec::new();

    // risk patterns: keyword clusters in disagreement text
    let mut risk_hits: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    for record in records {
        let combined = record.disagreements.join(" ").to_lowercase();
        for (keyword, name) in RISK_KEYWORDS {
            if combined.contains(keyword) {
                risk_hits.entry(name).or_default().push(record);
            }
        }
    }
    for (name, hits) in &risk_hits {
        let avg = hits.iter().map(|r| r.consensus_score).sum::<f64>() / hits.len() as f64;
        let success = success_rate_for(hits);
        patterns.push(Pattern {
            pattern_type: PatternType::Risk,
            name: name.to_string(),
            frequency: hits.len(),
            average_consensus: avg,
            success_rate: success,
            priority_score: priority_score(hits.len(), success),
        });
    }

    // file patterns: size bucket intersected with refactoring intent
    let mut file_buckets: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    for record in records {
        if record.focus_areas.iter().any(|f| f == "refactoring") {
            file_buckets
                .entry(file_size_bucket(record.file_size))
                .or_default()
                .push(record);
        }
    }
    for (bucket, hits) in &file_buckets {
        let avg = hits.iter().map(|r| r.consensus_score).sum::<f64>() / hits.len() as f64;
        let success = success_rate_for(hits);
        patterns.push(Pattern {
            pattern_type: PatternType::FilePattern,
            name: format!("file_size:{bucket}"),
            frequency: hits.len(),
            average_consensus: avg,
            success_rate: success,
            priority_score: priority_score(hits.len(), success),
        });
    }

    // focus patterns: frequency of focus-area tuples
    let mut focus_counts: HashMap<String, Vec<&DebateRecord>> = HashMap::new();
    for record in records {
        let mut areas = record.focus_areas.clone();
        areas.sort();
        focus_counts.entry(areas.join("+")).or_default().push(record);
    }
    for (tuple, hits) in &focus_counts {
        let avg = hits.iter().map(|r| r.consensus_score).sum::<f64>() / hits.len() as f64;
        let success = success_rate_for(hits);
        patterns.push(Pattern {
            pattern_type: PatternType::FocusPattern,
            name: format!("focus:{tuple}"),
            frequency: hits.len(),
            average_consensus: avg,
            success_rate: success,
            priority_score: priority_score(hits.len(), success),
        });
    }

    // consensus-band patterns
    let mut bands: HashMap<&str, Vec<&DebateRecord>> = HashMap::new();
    for record in records {
        bands
            .entry(consensus_band(record.consensus_score))
            .or_default()
            .push(record);
    }
    for (band, hits) in &bands {
        let avg = hits.iter().map(|r| r.consensus_score).sum::<f64>() / hits.len() as f64;
        let success = success_rate_for(hits);
        patterns.push(Pattern {
            pattern_type: PatternType::ConsensusPattern,
            name: format!("consensus:{band}"),
            frequency: hits.len(),
            average_consensus: avg,
            success_rate: success,
            priority_score: priority_score(hits.len(), success),
        });
    }

    patterns
}
