//! Iterative debate engine: runs an initial full debate,
//! then repeatedly revises the plan and re-debates until the target
//! consensus is reached or the iteration cap is hit, tracking the
//! best-ever result across the run (monotonic best, even if a later
//! iteration regresses).

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::adapter::LlmAdapter;
use crate::cache::content_hash;
use crate::config::DebateConfig;
use crate::delta_debate::{self, ChangeInfo};
use crate::error::DebateResult;
use crate::orchestrator::{DebateRunResult, ParallelOrchestrator};
use crate::plan_reviser::{self, RevisionResult};
use crate::scoring::{score_issue, Effort, Impact, Issue, ScoredIssue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationKind {
    FullDebate,
    DeltaDebate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub kind: IterationKind,
    pub consensus_score: f64,
    pub issues_addressed: Vec<String>,
    pub revision_summary: Option<String>,
    pub time_ms: u128,
    pub is_best: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeResult {
    pub best_result: DebateRunResult,
    pub best_consensus: f64,
    pub best_iteration: u32,
    pub final_consensus: f64,
    pub total_iterations: u32,
    pub iterations: Vec<IterationRecord>,
    pub target_consensus: u8,
    pub target_reached: bool,
    pub total_time_ms: u128,
    pub warnings: Vec<String>,
    pub total_revisions: u32,
    pub plan_file_path: String,
    pub final_plan_hash: String,
}

/// Turns a debate's free-form disagreements into scoreable issues so
/// the plan reviser has something to target. Each disagreement is
/// treated as progressively less severe by position -- the debate
/// itself already orders disagreements by how the moderator surfaced
/// them.
fn issues_from_disagreements(disagreements: &[String]) -> Vec<ScoredIssue> {
    let issues: Vec<Issue> = disagreements
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let severity = match i {
                0 => Severity::Critical,
                1 => Severity::High,
                2 => Severity::Medium,
                _ => Severity::Low,
            };
            Issue {
                title: text.chars().take(80).collect(),
                description: text.clone(),
                source: "debate".to_string(),
                proposed_fix: text.clone(),
                severity,
                impact: Impact::Medium,
                effort: Effort::Medium,
            }
        })
        .collect();

    issues
        .into_iter()
        .map(|issue| {
            let (score, label) = score_issue(issue.severity, issue.impact, issue.effort);
            ScoredIssue {
                issue,
                priority_score: score,
                priority_label: label,
            }
        })
        .collect()
}

/// Orchestrates the full iterative revision loop over
/// a plan file on disk, driven by a two-participant debate and a
/// revising adapter.
pub async fn run_iterative_debate(
    orchestrator: &ParallelOrchestrator,
    first: (&str, Arc<dyn LlmAdapter>),
    second: (&str, Arc<dyn LlmAdapter>),
    reviser_adapter: &dyn LlmAdapter,
    request: &str,
    file_path: &Path,
    focus_areas: Vec<String>,
    config: &DebateConfig,
) -> DebateResult<IterativeResult> {
    let target_consensus = config.target_consensus;
    let max_iterations = config.max_rounds;
    let overall_start = Instant::now();

    let mut iterations: Vec<IterationRecord> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut total_revisions = 0u32;
    let mut no_improvement_count = 0u32;

    let mut content = std::fs::read_to_string(file_path).map_err(|e| crate::error::DebateError::io(file_path, e))?;

    let iter_start = Instant::now();
    let mut result = orchestrator
        .run_debate(request, &content, focus_areas.clone(), first.clone(), second.clone(), false)
        .await?;
    let mut consensus = result.consensus_score;

    iterations.push(IterationRecord {
        iteration: 1,
        kind: IterationKind::FullDebate,
        consensus_score: consensus,
        issues_addressed: Vec::new(),
        revision_summary: None,
        time_ms: iter_start.elapsed().as_millis(),
        is_best: true,
    });

    let mut best_result = result.clone();
    let mut best_consensus = consensus;
    let mut best_iteration = 1u32;
    let mut previous_consensus = consensus;
    let mut previous_content = content.clone();
    let mut previous_hash = content_hash(&content);

    if consensus >= target_consensus as f64 {
        return Ok(finalize(
            best_result,
            best_consensus,
            best_iteration,
            iterations,
            target_consensus,
            overall_start.elapsed().as_millis(),
            total_revisions,
            warnings,
            file_path,
            &content,
        ));
    }

    let mut iteration = 2u32;
    while iteration <= max_iterations as u32 {
        let iter_start = Instant::now();

        let scored_issues = issues_from_disagreements(&result.disagreements);
        let revision: RevisionResult = plan_reviser::revise_plan(
            reviser_adapter,
            file_path,
            &scored_issues,
            &result.disagreements,
            consensus,
            target_consensus,
        )
        .await?;

        if !revision.success {
            warnings.push(format!(
                "Iteration {iteration}: Revision failed - {}",
                revision.error.unwrap_or_default()
            ));
            iteration += 1;
            continue;
        }

        if std::fs::write(file_path, &revision.revised_content).is_err() {
            warnings.push(format!("Iteration {iteration}: File write failed"));
            iteration += 1;
            continue;
        }
        total_revisions += 1;
        content = revision.revised_content;

        let current_hash = content_hash(&content);
        let change_info: ChangeInfo =
            delta_debate::detect_changes(&content, &current_hash, Some((&previous_hash, &previous_content)));
        let previous_line_count = previous_content.split('\n').count();
        let kind = if change_info.has_changes && delta_debate::should_use_delta_mode(&change_info, previous_line_count) {
            IterationKind::DeltaDebate
        } else {
            IterationKind::FullDebate
        };

        result = orchestrator
            .run_debate(request, &content, focus_areas.clone(), first.clone(), second.clone(), false)
            .await?;
        consensus = result.consensus_score;

        let is_best = consensus > best_consensus;
        if is_best {
            best_result = result.clone();
            best_consensus = consensus;
            best_iteration = iteration;
            for record in iterations.iter_mut() {
                record.is_best = false;
            }
        }

        iterations.push(IterationRecord {
            iteration,
            kind,
            consensus_score: consensus,
            issues_addressed: revision
                .issues_addressed
                .iter()
                .map(|i| i.issue.title.clone())
                .collect(),
            revision_summary: Some(revision.revision_summary),
            time_ms: iter_start.elapsed().as_millis(),
            is_best,
        });

        previous_content = content.clone();
        previous_hash = current_hash;

        if consensus >= target_consensus as f64 {
            break;
        }

        let improvement = consensus - previous_consensus;
        if improvement < config.min_improvement_threshold {
            no_improvement_count += 1;
            if no_improvement_count >= 2 {
                warnings.push(format!(
                    "No significant improvement in 2 consecutive iterations (iterations {}-{iteration})",
                    iteration - 1
                ));
            }
        } else {
            no_improvement_count = 0;
        }

        if consensus < previous_consensus - config.max_regression_tolerance {
            warnings.push(format!(
                "Iteration {iteration}: Regression detected ({previous_consensus} -> {consensus}, -{} points)",
                previous_consensus - consensus
            ));
        }

        previous_consensus = consensus;
        iteration += 1;
    }

    if iteration > max_iterations as u32 && consensus < target_consensus as f64 {
        warnings.push(format!("Max iterations ({max_iterations}) reached"));
    }

    let final_consensus = iterations.last().map(|r| r.consensus_score).unwrap_or(0.0);
    if final_consensus < target_consensus as f64 {
        warnings.push(format!(
            "Target consensus {target_consensus} not reached after {} iteration(s) (best: {best_consensus})",
            iterations.len()
        ));
    }

    Ok(finalize(
        best_result,
        best_consensus,
        best_iteration,
        iterations,
        target_consensus,
        overall_start.elapsed().as_millis(),
        total_revisions,
        warnings,
        file_path,
        &content,
    ))
}

#[allow(clippy::too_many_arguments)]
fn finalize(
    best_result: DebateRunResult,
    best_consensus: f64,
    best_iteration: u32,
    iterations: Vec<IterationRecord>,
    target_consensus: u8,
    total_time_ms: u128,
    total_revisions: u32,
    warnings: Vec<String>,
    file_path: &Path,
    final_content: &str,
) -> IterativeResult {
    let final_consensus = iterations.last().map(|r| r.consensus_score).unwrap_or(0.0);
    let target_reached = final_consensus >= target_consensus as f64;
    IterativeResult {
        best_result,
        best_consensus,
        best_iteration,
        final_consensus,
        total_iterations: iterations.len() as u32,
        iterations,
        target_consensus,
        target_reached,
        total_time_ms,
        warnings,
        total_revisions,
        plan_file_path: file_path.display().to_string(),
        final_plan_hash: content_hash(final_content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_from_disagreements_assigns_descending_severity() {
        let issues = issues_from_disagreements(&[
            "first disagreement".to_string(),
            "second disagreement".to_string(),
            "third disagreement".to_string(),
            "fourth disagreement".to_string(),
        ]);
        assert_eq!(issues[0].issue.severity, Severity::Critical);
        assert_eq!(issues[1].issue.severity, Severity::High);
        assert_eq!(issues[2].issue.severity, Severity::Medium);
        assert_eq!(issues[3].issue.severity, Severity::Low);
    }

    #[test]
    fn finalize_marks_target_reached_when_final_meets_target() {
        let iterations = vec![IterationRecord {
            iteration: 1,
            kind: IterationKind::FullDebate,
            consensus_score: 90.0,
            issues_addressed: Vec::new(),
            revision_summary: None,
            time_ms: 10,
            is_best: true,
        }];
        let result = finalize(
            DebateRunResult {
                consensus_score: 90.0,
                interpretation: "Strong Agreement".to_string(),
                recommendation: "[PROCEED]".to_string(),
                score_difference: 5.0,
                participants: Vec::new(),
                disagreements: Vec::new(),
                agreements: Vec::new(),
                focus_areas: Vec::new(),
                file_hash: "h".to_string(),
                total_time_ms: 10,
            },
            90.0,
            1,
            iterations,
            85,
            100,
            0,
            Vec::new(),
            Path::new("plan.md"),
            "final content",
        );
        assert!(result.target_reached);
        assert_eq!(result.plan_file_path, "plan.md");
        assert_eq!(result.final_plan_hash, content_hash("final content"));
    }
}
