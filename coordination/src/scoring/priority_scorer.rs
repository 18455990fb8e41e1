//! Priority scorer: turns a `(severity, impact, effort)`
//! triple into a `0..=100` priority score and a coarse band label.
//!
//! The reference's own worked examples (`score_issue("critical",
//! "high", "low") -> (80, stop_ship)`, `score_issue("high", "medium",
//! "medium") -> (45, medium)`) are stale relative to its own threshold
//! table -- see `DESIGN.md`. This implementation follows the
//! thresholds the original code actually applies (`>=85` stop_ship,
//! `>=65` high, `>=50` medium, else low), under which those two
//! examples score `high` and `low` respectively.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLabel {
    StopShip,
    High,
    Medium,
    Low,
}

impl PriorityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLabel::StopShip => "stop_ship",
            PriorityLabel::High => "high",
            PriorityLabel::Medium => "medium",
            PriorityLabel::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub description: String,
    pub source: String,
    pub proposed_fix: String,
    pub severity: Severity,
    pub impact: Impact,
    pub effort: Effort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub priority_score: i64,
    pub priority_label: PriorityLabel,
}

fn severity_points(s: Severity) -> i64 {
    match s {
        Severity::Critical => 40,
        Severity::High => 30,
        Severity::Medium => 20,
        Severity::Low => 10,
    }
}

fn impact_points(i: Impact) -> i64 {
    match i {
        Impact::High => 40,
        Impact::Medium => 25,
        Impact::Low => 10,
    }
}

fn effort_penalty(e: Effort) -> i64 {
    match e {
        Effort::Low => 0,
        Effort::Medium => -10,
        Effort::High => -20,
    }
}

pub fn label_for(score: i64) -> PriorityLabel {
    if score >= 85 {
        PriorityLabel::StopShip
    } else if score >= 65 {
        PriorityLabel::High
    } else if score >= 50 {
        PriorityLabel::Medium
    } else {
        PriorityLabel::Low
    }
}

/// `score = severity + impact + effort_penalty`, clamped to `[0, 100]`.
pub fn score_issue(severity: Severity, impact: Impact, effort: Effort) -> (i64, PriorityLabel) {
    let score = (severity_points(severity) + impact_points(impact) + effort_penalty(effort))
        .clamp(0, 100);
    (score, label_for(score))
}

/// Scores every issue in `issues` and returns them sorted descending
/// by priority score. Idempotent under repeated application.
pub fn score_issues(issues: Vec<Issue>) -> Vec<ScoredIssue> {
    let mut scored: Vec<ScoredIssue> = issues
        .into_iter()
        .map(|issue| {
            let (score, label) = score_issue(issue.severity, issue.impact, issue.effort);
            ScoredIssue {
                issue,
                priority_score: score,
                priority_label: label,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    scored
}

#[derive(Debug, Clone, Default)]
pub struct GroupedIssues<'a> {
    pub stop_ship: Vec<&'a ScoredIssue>,
    pub high: Vec<&'a ScoredIssue>,
    pub medium: Vec<&'a ScoredIssue>,
    pub low: Vec<&'a ScoredIssue>,
}

pub fn group_by_band(issues: &[ScoredIssue]) -> GroupedIssues<'_> {
    let mut grouped = GroupedIssues::default();
    for issue in issues {
        match issue.priority_label {
            PriorityLabel::StopShip => grouped.stop_ship.push(issue),
            PriorityLabel::High => grouped.high.push(issue),
            PriorityLabel::Medium => grouped.medium.push(issue),
            PriorityLabel::Low => grouped.low.push(issue),
        }
    }
    grouped
}

fn effort_hours(effort: Effort) -> f64 {
    match effort {
        Effort::Low => 0.5,
        Effort::Medium => 2.5,
        Effort::High => 6.0,
    }
}

fn format_hours(hours: f64) -> String {
    if hours < 1.0 {
        format!("{} minutes", (hours * 60.0) as i64)
    } else {
        format!("{hours:.1} hours")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixTimes {
    pub stop_ship: String,
    pub high: String,
    pub medium: String,
    pub low: String,
    pub total: String,
}

/// Total estimated fix-time per band and overall, mapping `effort` to
/// hours.
pub fn calculate_fix_time(issues: &[ScoredIssue]) -> FixTimes {
    let grouped = group_by_band(issues);
    let band_hours = |group: &[&ScoredIssue]| -> f64 {
        group.iter().map(|i| effort_hours(i.issue.effort)).sum()
    };

    let total: f64 = issues.iter().map(|i| effort_hours(i.issue.effort)).sum();

    FixTimes {
        stop_ship: format_hours(band_hours(&grouped.stop_ship)),
        high: format_hours(band_hours(&grouped.high)),
        medium: format_hours(band_hours(&grouped.medium)),
        low: format_hours(band_hours(&grouped.low)),
        total: format_hours(total),
    }
}

pub fn format_effort(effort: Effort) -> &'static str {
    match effort {
        Effort::Low => "<30 min",
        Effort::Medium => "1-4 hours",
        Effort::High => ">4 hours",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_high_low_scores_eighty() {
        let (score, label) = score_issue(Severity::Critical, Impact::High, Effort::Low);
        assert_eq!(score, 80);
        assert_eq!(label, PriorityLabel::High);
    }

    #[test]
    fn high_medium_medium_scores_forty_five() {
        let (score, label) = score_issue(Severity::High, Impact::Medium, Effort::Medium);
        assert_eq!(score, 45);
        assert_eq!(label, PriorityLabel::Low);
    }

    #[test]
    fn low_low_high_clamps_to_zero() {
        let (score, label) = score_issue(Severity::Low, Impact::Low, Effort::High);
        assert_eq!(score, 0);
        assert_eq!(label, PriorityLabel::Low);
    }

    #[test]
    fn higher_effort_lowers_the_score() {
        let (score, _) = score_issue(Severity::Critical, Impact::High, Effort::Low);
        let (score2, label2) = score_issue(Severity::Critical, Impact::High, Effort::Medium);
        assert!(score2 < score);
        assert_eq!(label2, PriorityLabel::Medium);
    }

    #[test]
    fn stop_ship_band_is_unreachable_through_the_point_table() {
        // critical(40) + high(40) + low-effort(0) = 80 is the maximum
        // achievable score; the stop_ship band (>=85) can only be
        // reached by some other path into the scorer (e.g. a pattern
        // detector override), never by `score_issue` alone.
        let (score, label) = score_issue(Severity::Critical, Impact::High, Effort::Low);
        assert_eq!(score, 80);
        assert_eq!(label, PriorityLabel::High);
    }

    fn sample_issue(title: &str, severity: Severity, impact: Impact, effort: Effort) -> Issue {
        Issue {
            title: title.to_string(),
            description: "desc".to_string(),
            source: "claude".to_string(),
            proposed_fix: "fix".to_string(),
            severity,
            impact,
            effort,
        }
    }

    #[test]
    fn score_issues_sorts_descending() {
        let issues = vec![
            sample_issue("Bug A", Severity::Low, Impact::Low, Effort::High),
            sample_issue("Bug B", Severity::Critical, Impact::High, Effort::Low),
        ];
        let scored = score_issues(issues);
        assert_eq!(scored[0].issue.title, "Bug B");
        assert_eq!(scored[0].priority_score, 80);
    }

    #[test]
    fn score_issues_is_idempotent_under_reapplication() {
        let issues = vec![
            sample_issue("Bug A", Severity::Low, Impact::Low, Effort::High),
            sample_issue("Bug B", Severity::Critical, Impact::High, Effort::Low),
            sample_issue("Bug C", Severity::High, Impact::Medium, Effort::Medium),
        ];
        let scored_once = score_issues(issues);
        let titles_once: Vec<&str> = scored_once.iter().map(|i| i.issue.title.as_str()).collect();
        let scores_once: Vec<i64> = scored_once.iter().map(|i| i.priority_score).collect();

        let reissues: Vec<Issue> = scored_once
            .iter()
            .map(|s| sample_issue(&s.issue.title, s.issue.severity, s.issue.impact, s.issue.effort))
            .collect();
        let scored_twice = score_issues(reissues);
        let titles_twice: Vec<&str> = scored_twice.iter().map(|i| i.issue.title.as_str()).collect();
        let scores_twice: Vec<i64> = scored_twice.iter().map(|i| i.priority_score).collect();

        assert_eq!(titles_once, titles_twice);
        assert_eq!(scores_once, scores_twice);
    }

    #[test]
    fn fix_time_totals_respect_effort_hours_table() {
        let issues = score_issues(vec![
            sample_issue("A", Severity::Critical, Impact::High, Effort::Low),
            sample_issue("B", Severity::Critical, Impact::High, Effort::High),
        ]);
        let times = calculate_fix_time(&issues);
        assert_eq!(times.total, "6.5 hours");
    }

    #[test]
    fn format_effort_matches_human_readable_table() {
        assert_eq!(format_effort(Effort::Low), "<30 min");
        assert_eq!(format_effort(Effort::Medium), "1-4 hours");
        assert_eq!(format_effort(Effort::High), ">4 hours");
    }
}
