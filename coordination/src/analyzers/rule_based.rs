//! Rule-based consensus analyzer: term overlap, structural
//! similarity, conflict-phrase penalty, and a length-ratio penalty,
//! combined into a single 0-100 score. Execute-gate threshold: 70.

use std::collections::HashSet;

use regex::Regex;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "are", "was", "were", "have", "has",
    "will", "can", "should", "would", "could", "from", "into", "than", "then", "them",
    "their", "about", "which", "when", "where", "while", "also", "just", "some", "more",
];

const ARCHITECTURE_TERMS: &[&str] = &[
    "architecture", "module", "component", "interface", "layer", "service", "pattern",
];

const IMPLEMENTATION_TERMS: &[&str] = &[
    "implementation", "function", "method", "class", "struct", "variable", "loop",
];

const CONFLICT_PHRASES: &[&str] = &[
    "strongly disagree",
    "fundamentally different",
    "incompatible with",
    "directly contradicts",
    "will not work",
    "completely wrong",
];

pub const RULE_BASED_EXECUTE_THRESHOLD: f64 = 70.0;

fn tokenize(text: &str) -> Vec<String> {
    let re = Regex::new(r"[A-Za-z]+").unwrap();
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extracts a key-term set: lowercase tokens, stopwords and len<=2
/// tokens discarded, then architecture terms replicated x3 and
/// implementation terms x2 before collecting into a `HashSet`. This
/// matches the reference's literal replicate-then-collect-into-a-set
/// sequence (the duplicates collapse under set construction, but which
/// terms survive short-token filtering is unaffected either way).
fn key_terms(text: &str) -> HashSet<String> {
    let mut weighted = Vec::new();
    for tok in tokenize(text) {
        if tok.len() <= 2 || STOPWORDS.contains(&tok.as_str()) {
            continue;
        }
        if ARCHITECTURE_TERMS.contains(&tok.as_str()) {
            for _ in 0..3 {
                weighted.push(tok.clone());
            }
        } else if IMPLEMENTATION_TERMS.contains(&tok.as_str()) {
            for _ in 0..2 {
                weighted.push(tok.clone());
            }
        } else {
            weighted.push(tok.clone());
        }
    }
    weighted.into_iter().collect()
}

fn term_overlap(a: &str, b: &str) -> f64 {
    let ta = key_terms(a);
    let tb = key_terms(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn ratio(a: usize, b: usize) -> f64 {
    if a == 0 && b == 0 {
        return 1.0;
    }
    let (min, max) = if a < b { (a, b) } else { (b, a) };
    if max == 0 {
        1.0
    } else {
        min as f64 / max as f64
    }
}

fn count_bullets(text: &str) -> usize {
    text.lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('-') || t.starts_with('*') || t.starts_with('•')
        })
        .count()
}

fn count_numbered(text: &str) -> usize {
    let re = Regex::new(r"^\s*\d+[.)]").unwrap();
    text.lines().filter(|l| re.is_match(l)).count()
}

fn structural_similarity(a: &str, b: &str) -> f64 {
    let lines = ratio(a.lines().count(), b.lines().count());
    let paragraphs = ratio(
        a.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
        b.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
    );
    let bullets = ratio(count_bullets(a), count_bullets(b));
    let numbered = ratio(count_numbered(a), count_numbered(b));
    (lines + paragraphs + bullets + numbered) / 4.0
}

fn conflict_penalty(a: &str, b: &str) -> f64 {
    let combined = format!("{a} {b}").to_lowercase();
    let hits: usize = CONFLICT_PHRASES
        .iter()
        .map(|phrase| combined.matches(phrase).count())
        .sum();
    (hits as f64 * 10.0).min(30.0)
}

fn length_penalty(a: &str, b: &str) -> f64 {
    let len_a = a.len().max(1) as f64;
    let len_b = b.len() as f64;
    let r = len_b / len_a;
    if (0.5..=2.0).contains(&r) {
        0.0
    } else {
        10.0
    }
}

/// Computes the rule-based consensus score in [0, 100] for two
/// free-form proposals.
pub fn rule_based_consensus(a: &str, b: &str) -> f64 {
    let term = term_overlap(a, b);
    let structural = structural_similarity(a, b);
    let conflict = conflict_penalty(a, b);
    let length = length_penalty(a, b);

    let score = term * 40.0 + structural * 30.0 + (30.0 - conflict) - length;
    score.clamp(0.0, 100.0)
}
