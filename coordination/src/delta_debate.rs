//! Delta debate: when a file's changes since its last
//! debated snapshot are small, builds a changed-sections-only prompt
//! and a resolved-issue heuristic instead of paying for a full
//! re-review.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedSection {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousDebateSnapshot {
    pub content: String,
    pub issue_titles: Vec<String>,
    pub issue_fixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeInfo {
    pub has_changes: bool,
    pub change_summary: String,
    pub changed_sections: Vec<ChangedSection>,
    pub previous_content_hash: Option<String>,
    pub current_content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCheck {
    pub title: String,
    pub resolved: bool,
    pub evidence: String,
}

/// Line-level diff: every run of lines where the current content
/// diverges from the same position in `previous_content` becomes one
/// section. Intentionally positional, not an LCS diff --
/// this mirrors the reference's walk-forward comparison.
fn detect_changed_sections(previous_content: &str, current_content: &str) -> Vec<ChangedSection> {
    let prev_lines: Vec<&str> = previous_content.split('\n').collect();
    let curr_lines: Vec<&str> = current_content.split('\n').collect();

    let mut sections = Vec::new();
    let mut i = 0;
    while i < curr_lines.len() {
        let diverges = i >= prev_lines.len() || curr_lines[i] != prev_lines[i];
        if diverges {
            let start_line = i + 1;
            let mut changed = Vec::new();
            while i < curr_lines.len() && (i >= prev_lines.len() || curr_lines[i] != prev_lines[i]) {
                changed.push(curr_lines[i]);
                i += 1;
            }
            sections.push(ChangedSection {
                start_line,
                end_line: i,
                content: changed.join("\n"),
            });
        } else {
            i += 1;
        }
    }
    sections
}

fn summarize_changes(sections: &[ChangedSection]) -> String {
    if sections.is_empty() {
        return "No changes detected".to_string();
    }
    let total_lines: usize = sections
        .iter()
        .map(|s| s.end_line - s.start_line + 1)
        .sum();
    format!("{} section(s) changed ({total_lines} lines total)", sections.len())
}

/// Compares `current_content` against `previous` (the snapshot at the
/// last debate, if any), producing the change info a caller needs to
/// decide between delta and full re-debate.
pub fn detect_changes(
    current_content: &str,
    current_hash: &str,
    previous: Option<(&str, &str)>,
) -> ChangeInfo {
    let Some((previous_hash, previous_content)) = previous else {
        return ChangeInfo {
            has_changes: true,
            change_summary: "No previous debate found - treat as initial debate".to_string(),
            changed_sections: Vec::new(),
            previous_content_hash: None,
            current_content_hash: current_hash.to_string(),
        };
    };

    if current_hash == previous_hash {
        return ChangeInfo {
            has_changes: false,
            change_summary: "No changes since last debate".to_string(),
            changed_sections: Vec::new(),
            previous_content_hash: Some(previous_hash.to_string()),
            current_content_hash: current_hash.to_string(),
        };
    }

    let changed_sections = detect_changed_sections(previous_content, current_content);
    ChangeInfo {
        has_changes: true,
        change_summary: summarize_changes(&changed_sections),
        previous_content_hash: Some(previous_hash.to_string()),
        current_content_hash: current_hash.to_string(),
        changed_sections,
    }
}

/// Delta mode applies only when there is a previous snapshot to diff
/// against and the changes touch under 30% of its line count.
pub fn should_use_delta_mode(change_info: &ChangeInfo, previous_line_count: usize) -> bool {
    if !change_info.has_changes {
        return false;
    }
    if change_info.previous_content_hash.is_none() {
        return false;
    }
    if change_info.changed_sections.is_empty() {
        return true;
    }
    if previous_line_count == 0 {
        return false;
    }
    let total_changed: usize = change_info
        .changed_sections
        .iter()
        .map(|s| s.end_line - s.start_line + 1)
        .sum();
    let change_percentage = (total_changed as f64 / previous_line_count as f64) * 100.0;
    change_percentage < 30.0
}

/// Builds a prompt scoped to only the changed sections plus a recap of
/// previously identified issues, instead of re-submitting the whole
/// file.
pub fn create_delta_prompt(change_info: &ChangeInfo, original_request: &str, previous_issue_titles: &[String]) -> String {
    let changed_sections_text = change_info
        .changed_sections
        .iter()
        .map(|s| format!("[Lines {}-{}]\n{}", s.start_line, s.end_line, s.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let previous_issues_text = previous_issue_titles
        .iter()
        .take(5)
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "This is a DELTA DEBATE (incremental review of changes only).\n\n\
         ORIGINAL REQUEST:\n{original_request}\n\n\
         CHANGE SUMMARY:\n{}\n\n\
         CHANGED SECTIONS:\n{changed_sections_text}\n\n\
         PREVIOUS ISSUES IDENTIFIED:\n{previous_issues_text}\n\n\
         Your task:\n\
         1. Review ONLY the changed sections (don't re-review unchanged parts)\n\
         2. Check if previous issues were addressed in changes\n\
         3. Identify any NEW issues introduced by changes\n\
         4. Give quick recommendation (approve changes / needs more work)\n\n\
         Focus on incremental analysis, not full re-review.\n",
        change_info.change_summary,
    )
}

fn extract_keywords(text: &str) -> Vec<String> {
    const COMMON_WORDS: &[&str] = &[
        "the", "this", "that", "with", "from", "have", "need", "should", "would", "could",
    ];
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| ".,!?;:".contains(c)).to_string())
        .filter(|w| w.chars().count() > 4 && !COMMON_WORDS.contains(&w.as_str()))
        .take(5)
        .collect()
}

/// Heuristically checks, per previously identified issue, whether any
/// of its fix keywords now appear among the changed lines. This is a
/// textual proxy, not a semantic verification -- matching the
/// reference's own keyword-overlap approach.
pub fn verify_resolved_issues(
    change_info: &ChangeInfo,
    previous_issue_titles: &[String],
    previous_issue_fixes: &[String],
) -> Vec<ResolutionCheck> {
    let changed_content = change_info
        .changed_sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    previous_issue_titles
        .iter()
        .zip(previous_issue_fixes.iter())
        .map(|(title, fix)| {
            let keywords = extract_keywords(fix);
            let resolved = keywords.iter().any(|kw| changed_content.contains(kw.as_str()));
            let evidence = if resolved {
                format!("Found fix keywords ({}) in changed sections", keywords.join(", "))
            } else {
                "Fix keywords not found in changes".to_string()
            };
            ResolutionCheck {
                title: title.clone(),
                resolved,
                evidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_previous_debate_means_initial_debate() {
        let info = detect_changes("new content", "hash1", None);
        assert!(info.has_changes);
        assert_eq!(info.change_summary, "No previous debate found - treat as initial debate");
    }

    #[test]
    fn identical_hash_means_no_changes() {
        let info = detect_changes("same", "h1", Some(("h1", "same")));
        assert!(!info.has_changes);
    }

    #[test]
    fn detects_single_changed_section() {
        let prev = "a\nb\nc\nd";
        let curr = "a\nX\nc\nd";
        let info = detect_changes(curr, "h2", Some(("h1", prev)));
        assert!(info.has_changes);
        assert_eq!(info.changed_sections.len(), 1);
        assert_eq!(info.changed_sections[0].start_line, 2);
        assert_eq!(info.changed_sections[0].end_line, 2);
    }

    #[test]
    fn delta_mode_false_without_previous_hash() {
        let info = ChangeInfo {
            has_changes: true,
            change_summary: "x".to_string(),
            changed_sections: Vec::new(),
            previous_content_hash: None,
            current_content_hash: "h".to_string(),
        };
        assert!(!should_use_delta_mode(&info, 100));
    }

    #[test]
    fn delta_mode_true_under_thirty_percent_changed() {
        let info = ChangeInfo {
            has_changes: true,
            change_summary: "1 section(s) changed (5 lines total)".to_string(),
            changed_sections: vec![ChangedSection {
                start_line: 1,
                end_line: 5,
                content: "x".to_string(),
            }],
            previous_content_hash: Some("h1".to_string()),
            current_content_hash: "h2".to_string(),
        };
        assert!(should_use_delta_mode(&info, 100));
    }

    #[test]
    fn delta_mode_false_over_thirty_percent_changed() {
        let info = ChangeInfo {
            has_changes: true,
            change_summary: "1 section(s) changed (40 lines total)".to_string(),
            changed_sections: vec![ChangedSection {
                start_line: 1,
                end_line: 40,
                content: "x".to_string(),
            }],
            previous_content_hash: Some("h1".to_string()),
            current_content_hash: "h2".to_string(),
        };
        assert!(!should_use_delta_mode(&info, 100));
    }

    #[test]
    fn verify_resolved_issues_matches_fix_keywords() {
        let info = ChangeInfo {
            has_changes: true,
            change_summary: "x".to_string(),
            changed_sections: vec![ChangedSection {
                start_line: 1,
                end_line: 1,
                content: "added retries around the payment gateway call".to_string(),
            }],
            previous_content_hash: Some("h1".to_string()),
            current_content_hash: "h2".to_string(),
        };
        let results = verify_resolved_issues(
            &info,
            &["Missing retry logic".to_string()],
            &["add retries to the payment call".to_string()],
        );
        assert_eq!(results.len(), 1);
        assert!(results[0].resolved);
    }
}
