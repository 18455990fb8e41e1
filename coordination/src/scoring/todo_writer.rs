//! Todo writer: extracts actionable todos from scored
//! issues, filtered to `priority_score >= 65`, with an auto-derived
//! present-continuous "active form" for progress display.

use super::priority_scorer::{format_effort, ScoredIssue};

pub const MIN_PRIORITY_SCORE: i64 = 65;

const VERB_GERUNDS: &[(&str, &str)] = &[
    ("fix ", "Fixing "),
    ("add ", "Adding "),
    ("remove ", "Removing "),
    ("update ", "Updating "),
    ("create ", "Creating "),
    ("delete ", "Deleting "),
    ("implement ", "Implementing "),
    ("refactor ", "Refactoring "),
    ("improve ", "Improving "),
    ("optimize ", "Optimizing "),
    ("debug ", "Debugging "),
    ("test ", "Testing "),
    ("write ", "Writing "),
    ("read ", "Reading "),
    ("check ", "Checking "),
    ("verify ", "Verifying "),
    ("validate ", "Validating "),
    ("migrate ", "Migrating "),
    ("upgrade ", "Upgrading "),
    ("downgrade ", "Downgrading "),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub content: String,
    pub status: &'static str,
    pub active_form: String,
}

/// Converts `title` to present-continuous form for `active_form`,
/// matching verbs against a fixed table and falling back to
/// `"Working on <title>"`.
fn create_active_form(title: &str) -> String {
    let lower = title.to_lowercase();
    for (verb, gerund) in VERB_GERUNDS {
        if lower.starts_with(verb) && title.is_char_boundary(verb.len()) {
            return format!("{gerund}{}", &title[verb.len()..]);
        }
    }
    format!("Working on {lower}")
}

/// Filters to `priority_score >= 65`, formats each as
/// `"<title> (<effort-string>)"`.
pub fn extract_todos(scored_issues: &[ScoredIssue]) -> Vec<Todo> {
    scored_issues
        .iter()
        .filter(|issue| issue.priority_score >= MIN_PRIORITY_SCORE)
        .map(|issue| {
            let effort = format_effort(issue.issue.effort);
            Todo {
                content: format!("{} ({effort})", issue.issue.title),
                status: "pending",
                active_form: create_active_form(&issue.issue.title),
            }
        })
        .collect()
}

pub fn format_todos_as_markdown(todos: &[Todo]) -> String {
    if todos.is_empty() {
        return "- [ ] No high-priority action items".to_string();
    }
    todos
        .iter()
        .map(|t| format!("- [ ] {}", t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary(todos: &[Todo]) -> String {
    match todos.len() {
        0 => "No high-priority action items".to_string(),
        1 => "1 action item".to_string(),
        n => format!("{n} action items"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::priority_scorer::{score_issues, Effort, Impact, Issue, Severity};

    fn issue(title: &str, severity: Severity, impact: Impact, effort: Effort) -> Issue {
        Issue {
            title: title.to_string(),
            description: String::new(),
            source: "claude".to_string(),
            proposed_fix: String::new(),
            severity,
            impact,
            effort,
        }
    }

    #[test]
    fn filters_to_high_priority_only() {
        let scored = score_issues(vec![
            issue("Critical bug", Severity::Critical, Impact::High, Effort::Low),
            issue("Nice to have", Severity::Low, Impact::Low, Effort::Low),
        ]);
        let todos = extract_todos(&scored);
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].content, "Critical bug (<30 min)");
    }

    #[test]
    fn active_form_replaces_known_verbs() {
        assert_eq!(create_active_form("Fix race condition"), "Fixing race condition");
        assert_eq!(create_active_form("Add row locking"), "Adding row locking");
        assert_eq!(create_active_form("Remove duplicate code"), "Removing duplicate code");
        assert_eq!(create_active_form("Update documentation"), "Updating documentation");
    }

    #[test]
    fn active_form_falls_back_to_working_on() {
        assert_eq!(create_active_form("Unknown action"), "Working on unknown action");
    }

    #[test]
    fn markdown_checklist_renders_empty_state() {
        assert_eq!(format_todos_as_markdown(&[]), "- [ ] No high-priority action items");
    }

    #[test]
    fn summary_pluralizes_correctly() {
        assert_eq!(summary(&[]), "No high-priority action items");
        let scored = score_issues(vec![issue(
            "Bug",
            Severity::Critical,
            Impact::High,
            Effort::Low,
        )]);
        let todos = extract_todos(&scored);
        assert_eq!(summary(&todos), "1 action item");
    }
}
