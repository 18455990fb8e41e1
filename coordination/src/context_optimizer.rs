//! Context optimizer: reduces a large plan to a focused
//! excerpt, plus a "focused prompt" asking for concise analysis.

use std::collections::HashMap;

const DEFAULT_LINE_BUDGET: usize = 200;
const ALL_FOCUS_AREAS: &[&str] = &[
    "refactoring",
    "database",
    "ui",
    "bug",
    "performance",
    "security",
];

fn keywords_for(focus_area: &str) -> &'static [&'static str] {
    match focus_area {
        "refactoring" => &["refactor", "clean", "extract", "simplify", "structure"],
        "database" => &["database", "query", "schema", "migration", "sql", "index"],
        "ui" => &["ui", "component", "render", "style", "layout", "view"],
        "bug" => &["bug", "fix", "error", "crash", "fail", "issue"],
        "performance" => &["performance", "slow", "optimize", "cache", "latency", "throughput"],
        "security" => &["security", "auth", "vulnerability", "sanitize", "inject", "token"],
        _ => &[],
    }
}

/// Infers focus areas from free-form request text by matching against
/// the closed keyword set; falls back to `["refactoring"]`.
pub fn infer_focus_areas(request: &str) -> Vec<String> {
    let lower = request.to_lowercase();
    let mut found: Vec<String> = ALL_FOCUS_AREAS
        .iter()
        .filter(|area| keywords_for(area).iter().any(|kw| lower.contains(kw)))
        .map(|s| s.to_string())
        .collect();
    if found.is_empty() {
        found.push("refactoring".to_string());
    }
    found
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    docstring: String,
    start_line: usize,
    end_line: usize,
    lines: Vec<String>,
}

fn line_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_function_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("fn ")
        || trimmed.starts_with("pub fn ")
        || trimmed.starts_with("async fn ")
        || trimmed.starts_with("def ")
}

fn is_class_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("class ")
        || trimmed.starts_with("struct ")
        || trimmed.starts_with("pub struct ")
        || trimmed.starts_with("impl ")
}

fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if trimmed.as_bytes().get(level) == Some(&b' ') {
            return Some(level);
        }
    }
    None
}

fn section_name(header: &str) -> String {
    header.trim().trim_start_matches('#').trim().to_string()
}

/// Parses a file into sections delimited by function/class headers or
/// markdown headings.
fn parse_sections(content: &str) -> Vec<Section> {
    let lines: Vec<&str> = content.lines().collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some(level) = heading_level(line) {
            let start = i;
            let mut j = i + 1;
            while j < lines.len() && heading_level(lines[j]).map(|l| l > level).unwrap_or(true) {
                if heading_level(lines[j]).map(|l| l <= level).unwrap_or(false) {
                    break;
                }
                j += 1;
            }
            sections.push(Section {
                name: section_name(line),
                docstring: lines.get(start + 1).unwrap_or(&"").to_string(),
                start_line: start,
                end_line: j,
                lines: lines[start..j].iter().map(|s| s.to_string()).collect(),
            });
            i = j.max(start + 1);
        } else if is_function_header(line) || is_class_header(line) {
            let header_indent = line_indent(line);
            let start = i;
            let mut j = i + 1;
            while j < lines.len() {
                let l = lines[j];
                if l.trim().is_empty() {
                    j += 1;
                    continue;
                }
                if line_indent(l) <= header_indent && (is_function_header(l) || is_class_header(l) || heading_level(l).is_some()) {
                    break;
                }
                if line_indent(l) <= header_indent && j > start + 1 {
                    break;
                }
                j += 1;
            }
            sections.push(Section {
                name: section_name(line),
                docstring: lines.get(start + 1).unwrap_or(&"").to_string(),
                start_line: start,
                end_line: j,
                lines: lines[start..j].iter().map(|s| s.to_string()).collect(),
            });
            i = j.max(start + 1);
        } else {
            i += 1;
        }
    }
    sections
}

fn score_section(section: &Section, focus_areas: &[String]) -> i64 {
    let mut score = 0i64;
    let name_lower = section.name.to_lowercase();
    let doc_lower = section.docstring.to_lowercase();
    let body_lower = section.lines.join("\n").to_lowercase();

    let mut keywords: Vec<&str> = Vec::new();
    for area in focus_areas {
        keywords.extend(keywords_for(area));
    }
    keywords.sort_unstable();
    keywords.dedup();

    for kw in &keywords {
        if name_lower.contains(kw) {
            score += 10;
        }
        if doc_lower.contains(kw) {
            score += 5;
        }
        score += 2 * body_lower.matches(kw).count() as i64;
    }
    score
}

pub struct Excerpt {
    pub content: String,
    pub truncated: bool,
}

/// Produces a bounded excerpt of `content`, biased toward sections
/// relevant to `focus_areas`, within `line_budget` lines.
pub fn extract_excerpt(content: &str, focus_areas: &[String], line_budget: Option<usize>) -> Excerpt {
    let budget = line_budget.unwrap_or(DEFAULT_LINE_BUDGET);
    let total_lines = content.lines().count();
    if total_lines <= budget {
        return Excerpt {
            content: content.to_string(),
            truncated: false,
        };
    }

    let mut sections = parse_sections(content);
    if sections.is_empty() {
        let lines: Vec<&str> = content.lines().take(budget).collect();
        return Excerpt {
            content: lines.join("\n"),
            truncated: true,
        };
    }

    let mut scored: Vec<(i64, usize)> = sections
        .iter()
        .enumerate()
        .map(|(idx, s)| (score_section(s, focus_areas), idx))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let target = (budget as f64 * 0.9) as usize;
    let mut selected_indices = Vec::new();
    let mut used = 0usize;
    for (_, idx) in scored {
        let len = sections[idx].lines.len();
        if used + len > budget {
            continue;
        }
        selected_indices.push(idx);
        used += len;
        if used >= target {
            break;
        }
    }
    selected_indices.sort_unstable();

    sections.retain(|_| true);
    let mut out = Vec::new();
    let mut prev_end: Option<usize> = None;
    for idx in &selected_indices {
        let section = &sections[*idx];
        if let Some(prev) = prev_end {
            if section.start_line > prev {
                out.push(format!(
                    "[... skipped {} lines ...]",
                    section.start_line - prev
                ));
            }
        }
        out.extend(section.lines.iter().cloned());
        prev_end = Some(section.end_line);
    }

    Excerpt {
        content: out.join("\n"),
        truncated: true,
    }
}

/// Builds the structured prompt asking for concise analysis, listing
/// both the active focus areas and the skipped complement.
pub fn create_focused_prompt(request: &str, excerpt: &Excerpt, focus_areas: &[String]) -> String {
    let skipped: Vec<&str> = ALL_FOCUS_AREAS
        .iter()
        .filter(|a| !focus_areas.iter().any(|f| f == *a))
        .copied()
        .collect();

    let mut prompt = String::new();
    prompt.push_str("Focus areas: ");
    prompt.push_str(&focus_areas.join(", "));
    prompt.push('\n');
    if !skipped.is_empty() {
        prompt.push_str("Skipped areas: ");
        prompt.push_str(&skipped.join(", "));
        prompt.push('\n');
    }
    prompt.push_str("\nRequest:\n");
    prompt.push_str(request);
    prompt.push_str("\n\nExcerpt:\n");
    prompt.push_str(&excerpt.content);
    prompt.push_str("\n\nProvide a concise analysis ending with \"Score: N/100\".\n");
    prompt
}

pub fn focus_keyword_table() -> HashMap<&'static str, Vec<&'static str>> {
    ALL_FOCUS_AREAS
        .iter()
        .map(|a| (*a, keywords_for(a).to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_budget_returns_content_verbatim() {
        let content = "line1\nline2\nline3";
        let excerpt = extract_excerpt(content, &["refactoring".to_string()], Some(200));
        assert_eq!(excerpt.content, content);
        assert!(!excerpt.truncated);
    }

    #[test]
    fn infer_focus_areas_matches_known_keywords() {
        let areas = infer_focus_areas("Fix the slow database query causing a crash");
        assert!(areas.contains(&"database".to_string()));
        assert!(areas.contains(&"performance".to_string()));
        assert!(areas.contains(&"bug".to_string()));
    }

    #[test]
    fn infer_focus_areas_falls_back_to_refactoring() {
        let areas = infer_focus_areas("do something unrelated entirely");
        assert_eq!(areas, vec!["refactoring".to_string()]);
    }

    #[test]
    fn long_file_produces_truncated_excerpt() {
        let mut content = String::new();
        for i in 0..500 {
            content.push_str(&format!("fn handler_{i}() {{\n    do_work();\n}}\n\n"));
        }
        let excerpt = extract_excerpt(&content, &["refactoring".to_string()], Some(50));
        assert!(excerpt.truncated);
        assert!(excerpt.content.lines().count() <= 60);
    }

    #[test]
    fn focused_prompt_lists_skipped_areas() {
        let excerpt = Excerpt {
            content: "body".to_string(),
            truncated: false,
        };
        let prompt = create_focused_prompt("do it", &excerpt, &["security".to_string()]);
        assert!(prompt.contains("Focus areas: security"));
        assert!(prompt.contains("Skipped areas:"));
        assert!(prompt.contains("database"));
    }

    #[test]
    fn keyword_table_covers_all_focus_areas() {
        let table = focus_keyword_table();
        assert_eq!(table.len(), ALL_FOCUS_AREAS.len());
        assert!(!table["security"].is_empty());
    }
}
