// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsers for child-agent output.
//!
//! Planner output carries tasks in a fenced ```tasks-json block (preferred)
//! or as `### Task N:` markdown headings (fallback). Reviewers answer with
//! Verdict/Issues/Suggestions sections. Interview generators emit
//! `### Q<N> (<type>)` blocks, and sync agents `### Updated: <task-id>`
//! blocks.

use pim_core::ReviewVerdict;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are fixed string literals; a failure is a typo caught
        // by the first test that touches the parser.
        Err(err) => unreachable!("bad static regex {pattern}: {err}"),
    })
}

// ---------------------------------------------------------------------------
// Planner task lists
// ---------------------------------------------------------------------------

/// A task parsed from planner output, before id allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Parse the fenced ```tasks-json block. `None` when no block parses.
pub fn parse_tasks_json(output: &str) -> Option<Vec<TaskDraft>> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = regex(&FENCE, r"(?s)```tasks-json\s*\n(.*?)```");
    for captures in fence.captures_iter(output) {
        if let Ok(drafts) = serde_json::from_str::<Vec<TaskDraft>>(&captures[1]) {
            return Some(drafts);
        }
    }
    None
}

/// Fallback: `### Task N: <title>` headings with an optional
/// `Dependencies:` line; body becomes the description.
pub fn parse_tasks_markdown(output: &str) -> Vec<TaskDraft> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    static DEPS: OnceLock<Regex> = OnceLock::new();
    let heading = regex(&HEADING, r"(?m)^### Task (\d+):\s*(.+)$");
    let deps_line = regex(&DEPS, r"(?mi)^Dependencies:\s*(.+)$");

    let mut drafts = Vec::new();
    let matches: Vec<_> = heading.captures_iter(output).collect();
    for (idx, captures) in matches.iter().enumerate() {
        let start = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let end = matches
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(output.len());
        let body = &output[start..end];

        let depends_on = deps_line
            .captures(body)
            .map(|c| {
                c[1].split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("none"))
                    .collect()
            })
            .unwrap_or_default();
        let description = deps_line.replace(body, "").trim().to_string();

        drafts.push(TaskDraft {
            title: captures[2].trim().to_string(),
            description,
            depends_on,
        });
    }
    drafts
}

/// Rewrite draft dependency strings to created task ids.
///
/// `created` maps draft index → assigned id, in creation order. A
/// dependency matches by lowercased title or by `task N` / `task-N`
/// alias referring to the Nth draft.
pub fn resolve_dependencies(drafts: &[TaskDraft], created: &[String]) -> Vec<Vec<String>> {
    static ALIAS: OnceLock<Regex> = OnceLock::new();
    let alias = regex(&ALIAS, r"(?i)^task[ -](\d+)$");

    let by_title: HashMap<String, &String> = drafts
        .iter()
        .zip(created)
        .map(|(draft, id)| (draft.title.to_lowercase(), id))
        .collect();

    drafts
        .iter()
        .map(|draft| {
            draft
                .depends_on
                .iter()
                .filter_map(|dep| {
                    let dep = dep.trim();
                    if let Some(id) = by_title.get(&dep.to_lowercase()) {
                        return Some((*id).clone());
                    }
                    let n: usize = alias.captures(dep)?.get(1)?.as_str().parse().ok()?;
                    created.get(n.checked_sub(1)?).cloned()
                })
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Review output
// ---------------------------------------------------------------------------

/// Parsed reviewer answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewParse {
    pub verdict: ReviewVerdict,
    pub summary: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Parse Verdict / Issues / Suggestions sections. `None` without a verdict.
pub fn parse_review(output: &str) -> Option<ReviewParse> {
    static VERDICT: OnceLock<Regex> = OnceLock::new();
    let verdict_line = regex(&VERDICT, r"(?mi)^(?:#+\s*)?Verdict:?\s*(.+)$");
    let captures = verdict_line.captures(output)?;
    let verdict = ReviewVerdict::parse(&captures[1])?;

    let summary = captures
        .get(0)
        .map(|m| output[m.end()..].lines().map(str::trim).find(|l| !l.is_empty() && !l.starts_with('#')))
        .flatten()
        .unwrap_or("")
        .to_string();

    Some(ReviewParse {
        verdict,
        summary,
        issues: section_bullets(output, "Issues"),
        suggestions: section_bullets(output, "Suggestions"),
    })
}

/// Bullet items under a `## <name>` (or `<name>:`) heading.
fn section_bullets(output: &str, name: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut in_section = false;
    for line in output.lines() {
        let trimmed = line.trim();
        let is_heading = trimmed.starts_with('#') || trimmed.ends_with(':');
        if is_heading {
            let label = trimmed.trim_start_matches('#').trim().trim_end_matches(':');
            in_section = label.eq_ignore_ascii_case(name);
            continue;
        }
        if in_section {
            if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
                bullets.push(item.trim().to_string());
            }
        }
    }
    bullets
}

// ---------------------------------------------------------------------------
// Interview questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multi,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub number: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Parse `### Q<N> (<type>)` blocks: first non-empty line is the prompt,
/// bullets are options. Unknown types are skipped.
pub fn parse_interview(output: &str) -> Vec<InterviewQuestion> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    let heading = regex(&HEADING, r"(?m)^### Q(\d+)\s*\((\w+)\)\s*$");

    let matches: Vec<_> = heading.captures_iter(output).collect();
    let mut questions = Vec::new();
    for (idx, captures) in matches.iter().enumerate() {
        let qtype = match captures[2].to_lowercase().as_str() {
            "single" => QuestionType::Single,
            "multi" => QuestionType::Multi,
            "text" => QuestionType::Text,
            other => {
                tracing::warn!(qtype = other, "skipping interview question with unknown type");
                continue;
            }
        };
        let Ok(number) = captures[1].parse() else {
            continue;
        };
        let start = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let end = matches
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(output.len());
        let body = &output[start..end];

        let prompt = body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('-') && !l.starts_with('*'))
            .unwrap_or("")
            .to_string();
        let options = body
            .lines()
            .map(str::trim)
            .filter_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("* ")))
            .map(|o| o.trim().to_string())
            .collect();

        questions.push(InterviewQuestion { number, question_type: qtype, prompt, options });
    }
    questions
}

// ---------------------------------------------------------------------------
// Sync amendments
// ---------------------------------------------------------------------------

/// Parse `### Updated: <task-id>` blocks; the "New content" section of
/// each block is the amendment to append to that task's spec.
pub fn parse_sync_updates(output: &str) -> Vec<(String, String)> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    static NEW_CONTENT: OnceLock<Regex> = OnceLock::new();
    let heading = regex(&HEADING, r"(?m)^### Updated:\s*(task-\d+)\s*$");
    let new_content = regex(&NEW_CONTENT, r"(?ms)^(?:#+\s*)?New content:?\s*\n(.*)");

    let matches: Vec<_> = heading.captures_iter(output).collect();
    let mut updates = Vec::new();
    for (idx, captures) in matches.iter().enumerate() {
        let start = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let end = matches
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(output.len());
        let body = &output[start..end];

        if let Some(content) = new_content.captures(body) {
            let amendment = content[1].trim().to_string();
            if !amendment.is_empty() {
                updates.push((captures[1].to_string(), amendment));
            }
        }
    }
    updates
}

// ---------------------------------------------------------------------------
// Planning progress log truncation
// ---------------------------------------------------------------------------

/// Marker separating planning runs in `planning-progress.md`.
pub const RUN_HEADER_PREFIX: &str = "## Planning run";

/// Keep the prompt under `max_bytes`: retain everything before the first
/// run header (the notes prefix) and the latest run; elide earlier runs.
pub fn truncate_progress_log(content: &str, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content.to_string();
    }
    let run_starts: Vec<usize> = content
        .match_indices(RUN_HEADER_PREFIX)
        .map(|(idx, _)| idx)
        .collect();
    let (Some(first), Some(last)) = (run_starts.first(), run_starts.last()) else {
        // No run structure; keep the tail.
        let start = content.len() - max_bytes;
        let start = (start..content.len()).find(|i| content.is_char_boundary(*i)).unwrap_or(0);
        return format!("[... progress truncated]\n{}", &content[start..]);
    };
    let prefix = &content[..*first];
    let current = &content[*last..];
    format!("{prefix}[... earlier planning runs elided]\n\n{current}")
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
