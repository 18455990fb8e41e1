//! Plan reviser: asks an LLM adapter to revise a plan file
//! in place based on the top scored issues and disagreements from a
//! debate round, then validates the revision is neither a no-op nor a
//! full rewrite.

use std::path::Path;

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm};

use crate::adapter::LlmAdapter;
use crate::error::{DebateError, DebateResult};
use crate::scoring::{ScoredIssue, Severity};

const MAX_ISSUES: usize = 5;
const MAX_DISAGREEMENTS: usize = 5;
const MIN_REVISED_LEN: usize = 100;
const MIN_CHANGE_PCT: f64 = 1.0;
const MAX_CHANGE_PCT: f64 = 50.0;

const REVISION_PROMPT_HEADER: &str = "You are revising a technical plan based on AI debate feedback.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionResult {
    pub success: bool,
    pub revised_content: String,
    pub issues_addressed: Vec<ScoredIssue>,
    pub revision_summary: String,
    pub error: Option<String>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Filters to `priority_score >= 65` and returns the top 5 by score
/// (matching the scorer's own high-priority threshold).
fn prioritize_issues(scored_issues: &[ScoredIssue]) -> Vec<ScoredIssue> {
    let mut high_priority: Vec<ScoredIssue> = scored_issues
        .iter()
        .filter(|i| i.priority_score >= 65)
        .cloned()
        .collect();
    high_priority.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    high_priority.truncate(MAX_ISSUES);
    high_priority
}

fn severity_upper(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
    }
}

fn format_issues(issues: &[ScoredIssue]) -> String {
    if issues.is_empty() {
        return "(No critical/high issues identified)".to_string();
    }
    let mut lines = Vec::new();
    for (i, issue) in issues.iter().enumerate() {
        let severity = severity_upper(issue.issue.severity);
        lines.push(format!(
            "{}. [{} - {}/100] {}",
            i + 1,
            severity,
            issue.priority_score,
            issue.issue.title
        ));
        if !issue.issue.description.is_empty() && issue.issue.description != issue.issue.title {
            lines.push(format!("   Concern: {}", truncate_chars(&issue.issue.description, 200)));
        }
        if !issue.issue.proposed_fix.is_empty() {
            lines.push(format!("   Fix Required: {}", truncate_chars(&issue.issue.proposed_fix, 200)));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn format_disagreements(disagreements: &[String]) -> String {
    if disagreements.is_empty() {
        return "(No major disagreements identified)".to_string();
    }
    let lines: Vec<String> = disagreements
        .iter()
        .take(MAX_DISAGREEMENTS)
        .filter(|d| !d.is_empty())
        .map(|d| format!("- {}", truncate_chars(d, 150)))
        .collect();
    if lines.is_empty() {
        "(No major disagreements)".to_string()
    } else {
        lines.join("\n")
    }
}

fn generate_revision_prompt(
    original_content: &str,
    formatted_issues: &str,
    formatted_disagreements: &str,
    consensus_score: f64,
    target_consensus: u8,
    num_issues: usize,
) -> String {
    format!(
        "{REVISION_PROMPT_HEADER}\n\n\
         ORIGINAL PLAN:\n\
         \u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\n\
         {original_content}\n\
         \u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\n\n\
         DEBATE CONSENSUS: {consensus_score}/100 (target: {target_consensus}+)\n\n\
         KEY ISSUES TO ADDRESS (Top {num_issues}):\n\
         {formatted_issues}\n\n\
         DISAGREEMENTS FROM DEBATE:\n\
         {formatted_disagreements}\n\n\
         YOUR TASK:\n\
         1. Carefully read the original plan above\n\
         2. Address ONLY the specific issues listed in \"KEY ISSUES\"\n\
         3. Preserve the overall structure, headings, and format\n\
         4. Make minimal, targeted changes to resolve concerns\n\
         5. Do NOT add new sections or major restructuring\n\
         6. Do NOT add explanations or meta-commentary\n\
         7. Return the COMPLETE revised plan (not just changes/diffs)\n\n\
         CRITICAL REQUIREMENTS:\n\
         - Output ONLY the revised plan content\n\
         - No markdown code blocks, no \"Here is...\", no explanations\n\
         - Just the raw plan text, ready to be saved to file\n\n\
         BEGIN REVISED PLAN:\n"
    )
}

/// Similarity-ratio based change percentage between line sequences,
/// matching `difflib.SequenceMatcher.ratio()`'s `2*M/T` definition:
/// `M` is the number of matching elements found by
/// `capture_diff_slices`, `T` is the total element count of both
/// sequences.
fn calculate_change_percentage(original: &str, revised: &str) -> f64 {
    let original_lines: Vec<&str> = original.lines().collect();
    let revised_lines: Vec<&str> = revised.lines().collect();

    let ops = capture_diff_slices(Algorithm::Myers, &original_lines, &revised_lines);
    let matches: usize = ops
        .iter()
        .map(|op| match op {
            similar::DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    let total = original_lines.len() + revised_lines.len();
    if total == 0 {
        return 0.0;
    }
    let ratio = (2 * matches) as f64 / total as f64;
    (1.0 - ratio) * 100.0
}

fn validate_revision(original: &str, revised: &str) -> Result<(), String> {
    if revised.len() < MIN_REVISED_LEN {
        return Err("Revision too short or empty".to_string());
    }
    if revised == original {
        return Err("No changes made by reviser".to_string());
    }
    let change_pct = calculate_change_percentage(original, revised);
    if change_pct < MIN_CHANGE_PCT {
        return Err(format!("Changes too minimal ({change_pct:.1}%)"));
    }
    if change_pct > MAX_CHANGE_PCT {
        return Err(format!(
            "Plan appears to be rewritten ({change_pct:.1}% changed), not revised"
        ));
    }
    Ok(())
}

fn generate_revision_summary(issues_addressed: &[ScoredIssue], original: &str, revised: &str) -> String {
    if issues_addressed.is_empty() {
        return "Minor improvements".to_string();
    }
    let change_pct = calculate_change_percentage(original, revised);
    let titles: Vec<String> = issues_addressed
        .iter()
        .take(3)
        .map(|i| truncate_chars(&i.issue.title, 50))
        .collect();

    let summary = match issues_addressed.len() {
        1 => format!("Addressed: {}", titles[0]),
        2 => format!("Addressed: {} and {}", titles[0], titles[1]),
        n => format!(
            "Addressed: {}, {}, and {} more issue(s)",
            titles[0],
            titles[1],
            n - 2
        ),
    };
    format!("{summary} ({change_pct:.1}% of plan revised)")
}

/// Reads `plan_file_path`, asks `adapter` to revise it based on
/// `scored_issues`/`disagreements`, and validates the result before
/// returning. On any failure the original content is returned
/// unchanged alongside the `error` explanation.
pub async fn revise_plan(
    adapter: &dyn LlmAdapter,
    plan_file_path: &Path,
    scored_issues: &[ScoredIssue],
    disagreements: &[String],
    consensus_score: f64,
    target_consensus: u8,
) -> DebateResult<RevisionResult> {
    let original_content = std::fs::read_to_string(plan_file_path)
        .map_err(|e| DebateError::io(plan_file_path, e))?;

    let prioritized = prioritize_issues(scored_issues);
    if prioritized.is_empty() {
        return Ok(RevisionResult {
            success: false,
            revised_content: original_content,
            issues_addressed: Vec::new(),
            revision_summary: String::new(),
            error: Some("No issues to address".to_string()),
        });
    }

    let prompt = generate_revision_prompt(
        &original_content,
        &format_issues(&prioritized),
        &format_disagreements(disagreements),
        consensus_score,
        target_consensus,
        prioritized.len(),
    );

    let invoke_result = adapter.invoke(&prompt, None).await;
    let revised_content = match invoke_result {
        Ok(response) => response.text.trim().to_string(),
        Err(e) => {
            return Ok(RevisionResult {
                success: false,
                revised_content: original_content,
                issues_addressed: prioritized,
                revision_summary: String::new(),
                error: Some(format!("adapter invocation failed: {e}")),
            });
        }
    };

    if let Err(validation_error) = validate_revision(&original_content, &revised_content) {
        return Ok(RevisionResult {
            success: false,
            revised_content: original_content,
            issues_addressed: prioritized,
            revision_summary: String::new(),
            error: Some(format!("Revision validation failed: {validation_error}")),
        });
    }

    let revision_summary = generate_revision_summary(&prioritized, &original_content, &revised_content);

    Ok(RevisionResult {
        success: true,
        revised_content,
        issues_addressed: prioritized,
        revision_summary,
        error: None,
    })
}
