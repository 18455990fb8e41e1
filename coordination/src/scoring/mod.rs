//! Priority scoring and decision-pack formatting.

mod decision_pack_formatter;
mod priority_scorer;
mod todo_writer;

pub use decision_pack_formatter::{
    format_structured, Alternative, DecisionPackInput, Disagreement, MAX_LINES, QUICK_ACTION_COUNT,
};
pub use priority_scorer::{
    calculate_fix_time, format_effort, group_by_band, label_for, score_issue, score_issues, Effort,
    FixTimes, GroupedIssues, Impact, Issue, PriorityLabel, ScoredIssue, Severity,
};
pub use todo_writer::{extract_todos, format_todos_as_markdown, summary, Todo, MIN_PRIORITY_SCORE};
