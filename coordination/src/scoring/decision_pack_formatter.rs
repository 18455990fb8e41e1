//! Decision pack formatter: renders a structured,
//! markdown decision pack from scored issues and debate metadata,
//! targeting a soft limit of 300 lines.

use super::priority_scorer::{calculate_fix_time, group_by_band, PriorityLabel, ScoredIssue};

pub const QUICK_ACTION_COUNT: usize = 5;
pub const MAX_LINES: usize = 300;

#[derive(Debug, Clone, Default)]
pub struct Disagreement {
    pub topic: String,
    pub claude_view: String,
    pub codex_view: String,
    pub impact: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default)]
pub struct Alternative {
    pub title: String,
    pub pros: String,
    pub cons: String,
    pub consensus: String,
}

#[derive(Debug, Clone)]
pub struct DecisionPackInput<'a> {
    pub topic: String,
    pub consensus_score: i64,
    pub claude_score: i64,
    pub codex_score: i64,
    pub debate_time_seconds: u64,
    pub scored_issues: &'a [ScoredIssue],
    pub disagreements: Vec<Disagreement>,
    pub approved_aspects: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

fn interpret_consensus(score: i64) -> &'static str {
    if score >= 85 {
        "Strong Agreement"
    } else if score >= 70 {
        "Moderate Agreement"
    } else if score >= 50 {
        "Significant Disagreements"
    } else {
        "Fundamental Disagreements"
    }
}

fn execution_recommendation(consensus_score: i64, stop_ship_count: usize) -> String {
    if stop_ship_count > 0 {
        format!("[CONDITIONAL GO] - fix {stop_ship_count} stop-ship issues first")
    } else if consensus_score >= 85 {
        "[GO] - proceed with confidence".to_string()
    } else if consensus_score >= 70 {
        "[PROCEED WITH CAUTION] - address key concerns".to_string()
    } else if consensus_score >= 50 {
        "[REVIEW NEEDED] - significant issues to resolve".to_string()
    } else {
        "[NO-GO] - fundamental disagreements, reconsider approach".to_string()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn format_header(input: &DecisionPackInput, exec_rec: &str) -> String {
    format!(
        "# AI DEBATE DECISION PACK: {}\n\n\
         **Consensus:** {}/100 ({})\n\
         **Execution Recommendation:** {}\n\
         **Debate Time:** {} seconds\n\
         **Participants:** Claude ({}/100) + Codex ({}/100)\n\n---",
        input.topic,
        input.consensus_score,
        interpret_consensus(input.consensus_score),
        exec_rec,
        input.debate_time_seconds,
        input.claude_score,
        input.codex_score,
    )
}

fn format_quick_action_summary(scored_issues: &[ScoredIssue]) -> String {
    let top: Vec<&ScoredIssue> = scored_issues.iter().take(QUICK_ACTION_COUNT).collect();
    if top.is_empty() {
        return "## QUICK ACTION SUMMARY\n\n\
                No critical issues found - plan approved as-is\n\n---"
            .to_string();
    }

    let fix_times = calculate_fix_time(scored_issues);
    let mut lines = vec!["## QUICK ACTION SUMMARY (Top 5 Must-Fix)".to_string(), String::new()];
    for (i, issue) in top.iter().enumerate() {
        let title = truncate(&issue.issue.title, 60);
        lines.push(format!(
            "{}. [{}]: {} ({:?} impact)",
            i + 1,
            issue.priority_label.as_str(),
            title,
            issue.issue.impact,
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "**Estimated Fix Time:** {} (stop-ship) + {} (high)",
        fix_times.stop_ship, fix_times.high
    ));
    lines.push(format!("**Total Effort:** {}", fix_times.total));
    let stop_ship_count = scored_issues
        .iter()
        .filter(|i| i.priority_label == PriorityLabel::StopShip)
        .count();
    let risk_level = if stop_ship_count >= 3 { "HIGH" } else { "MEDIUM" };
    lines.push(format!("**Risk Reduction:** {risk_level}"));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.join("\n")
}

fn format_issues_by_severity(scored_issues: &[ScoredIssue]) -> String {
    let grouped = group_by_band(scored_issues);
    let mut lines = vec!["## ISSUES BY SEVERITY".to_string(), String::new()];

    if !grouped.stop_ship.is_empty() {
        lines.push("### STOP-SHIP ISSUES (Must Fix Before Release)".to_string());
        lines.push(String::new());
        lines.push("| # | Issue | Impact | Effort | Fix |".to_string());
        lines.push("|---|-------|--------|--------|-----|".to_string());
        for (i, issue) in grouped.stop_ship.iter().enumerate() {
            lines.push(format!(
                "| {} | {} | {:?} | {} | {} |",
                i + 1,
                truncate(&issue.issue.title, 40),
                issue.issue.impact,
                super::priority_scorer::format_effort(issue.issue.effort),
                truncate(&issue.issue.proposed_fix, 30),
            ));
        }
        lines.push(String::new());
    }

    if !grouped.high.is_empty() {
        lines.push("### HIGH PRIORITY (Strongly Recommended)".to_string());
        lines.push(String::new());
        lines.push("| # | Issue | Impact | Effort | Fix |".to_string());
        lines.push("|---|-------|--------|--------|-----|".to_string());
        for (i, issue) in grouped.high.iter().enumerate() {
            lines.push(format!(
                "| {} | {} | {:?} | {} | {} |",
                i + 1,
                truncate(&issue.issue.title, 40),
                issue.issue.impact,
                super::priority_scorer::format_effort(issue.issue.effort),
                truncate(&issue.issue.proposed_fix, 30),
            ));
        }
        lines.push(String::new());
    }

    if !grouped.medium.is_empty() {
        lines.push("### MEDIUM PRIORITY (Nice to Have)".to_string());
        lines.push(String::new());
        for issue in &grouped.medium {
            lines.push(format!(
                "- {} ({})",
                issue.issue.title,
                super::priority_scorer::format_effort(issue.issue.effort)
            ));
        }
        lines.push(String::new());
    }

    if !grouped.low.is_empty() {
        lines.push("### LOW PRIORITY".to_string());
        lines.push(format!(
            "*{} optional improvements (see full analysis)*",
            grouped.low.len()
        ));
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.join("\n")
}

fn format_disagreements(disagreements: &[Disagreement]) -> String {
    let mut lines = vec!["## DISAGREEMENTS REQUIRING USER DECISION".to_string(), String::new()];
    for (i, d) in disagreements.iter().enumerate() {
        lines.push(format!("### Disagreement #{}: {}", i + 1, d.topic));
        lines.push(String::new());
        lines.push(format!("- **Claude:** {}", d.claude_view));
        lines.push(format!("- **Codex:** {}", d.codex_view));
        lines.push(format!("- **Impact:** {}", d.impact));
        lines.push(format!("- **Recommendation:** {}", d.recommendation));
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.join("\n")
}

fn format_approved_aspects(aspects: &[String]) -> String {
    let mut lines = vec!["## APPROVED ASPECTS (Proceed As-Is)".to_string(), String::new()];
    for aspect in aspects {
        lines.push(format!("- {aspect}"));
    }
    lines.push(String::new());
    lines.push("---".to_string());
    lines.join("\n")
}

fn format_alternatives(alternatives: &[Alternative]) -> String {
    let mut lines = vec!["## ALTERNATIVE APPROACHES".to_string(), String::new()];
    for (i, alt) in alternatives.iter().enumerate() {
        lines.push(format!("### Alternative {}: {}", i + 1, alt.title));
        lines.push(String::new());
        lines.push(format!("**Pros:** {}", alt.pros));
        lines.push(format!("**Cons:** {}", alt.cons));
        lines.push(format!("**Consensus:** {}", alt.consensus));
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.join("\n")
}

fn format_final_recommendation(
    consensus_score: i64,
    stop_ship_count: usize,
    high_count: usize,
    fix_times_stop_ship: &str,
) -> String {
    let mut lines = vec!["## FINAL RECOMMENDATION".to_string(), String::new()];
    if stop_ship_count > 0 {
        lines.push("**Decision:** [CONDITIONAL GO]".to_string());
        lines.push(String::new());
        lines.push("**Conditions:**".to_string());
        lines.push(format!(
            "1. Fix {stop_ship_count} stop-ship issues ({fix_times_stop_ship}) BEFORE starting"
        ));
        if high_count > 0 {
            lines.push(format!("2. Address {high_count} high-priority items during implementation"));
        }
        lines.push(String::new());
        lines.push("**If conditions met:** high confidence of success".to_string());
        lines.push("**If conditions ignored:** high risk of critical issues".to_string());
    } else if consensus_score >= 85 {
        lines.push("**Decision:** [GO] - Proceed with Confidence".to_string());
        lines.push(String::new());
        lines.push(format!("**Consensus:** {consensus_score}/100 (Strong agreement)"));
        lines.push(format!("**High-priority items:** {high_count} (address during implementation)"));
    } else if consensus_score >= 70 {
        lines.push("**Decision:** [PROCEED WITH CAUTION]".to_string());
        lines.push(String::new());
        lines.push(format!("**Consensus:** {consensus_score}/100 (Moderate agreement)"));
        lines.push("**Action:** Address key concerns before proceeding".to_string());
    } else {
        lines.push("**Decision:** [REVIEW NEEDED]".to_string());
        lines.push(String::new());
        lines.push(format!("**Consensus:** {consensus_score}/100 (Significant disagreements)"));
        lines.push("**Action:** Resolve fundamental issues before implementation".to_string());
    }
    lines.push(String::new());
    lines.push("---".to_string());
    lines.join("\n")
}

/// Renders the full decision pack markdown, section by section.
/// Sections joined with a blank line, matching the reference's
/// `'\n\n'.join(sections)`.
pub fn format_structured(input: &DecisionPackInput) -> String {
    let grouped = group_by_band(input.scored_issues);
    let fix_times = calculate_fix_time(input.scored_issues);
    let exec_rec = execution_recommendation(input.consensus_score, grouped.stop_ship.len());

    let mut sections = vec![
        format_header(input, &exec_rec),
        format_quick_action_summary(input.scored_issues),
        format_issues_by_severity(input.scored_issues),
    ];

    if !input.disagreements.is_empty() {
        sections.push(format_disagreements(&input.disagreements));
    }
    if !input.approved_aspects.is_empty() {
        sections.push(format_approved_aspects(&input.approved_aspects));
    }
    if !input.alternatives.is_empty() {
        sections.push(format_alternatives(&input.alternatives));
    }

    sections.push(format_final_recommendation(
        input.consensus_score,
        grouped.stop_ship.len(),
        grouped.high.len(),
        &fix_times.stop_ship,
    ));

    sections.join("\n\n")
}
