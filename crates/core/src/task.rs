// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan and task records for the crew subsystem.
//!
//! Lifecycle:
//!
//! ```text
//! todo → in_progress → done
//!          ↓     ↑
//!       blocked → todo (unblock)
//! any → todo (reset, optional cascade)
//! ```
//!
//! Persistence and transitions live in `pim-engine::crew_store`; this
//! module holds the records plus the pure rules (readiness, graph
//! validation).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-project plan record (`crew/plan.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// PRD path relative to the project root.
    pub prd_path: String,
    /// Epoch milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub task_count: usize,
    #[serde(default)]
    pub completed_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

crate::simple_display! {
    TaskStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
        Blocked => "blocked",
    }
}

/// Reviewer's categorical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Ship,
    NeedsWork,
    MajorRethink,
}

crate::simple_display! {
    ReviewVerdict {
        Ship => "SHIP",
        NeedsWork => "NEEDS_WORK",
        MajorRethink => "MAJOR_RETHINK",
    }
}

impl ReviewVerdict {
    /// Parse from reviewer output; tolerant of case and surrounding text.
    pub fn parse(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        // Order matters: MAJOR_RETHINK before NEEDS_WORK before SHIP so a
        // verdict line quoting an earlier one still resolves correctly.
        if upper.contains("MAJOR_RETHINK") || upper.contains("MAJOR RETHINK") {
            Some(Self::MajorRethink)
        } else if upper.contains("NEEDS_WORK") || upper.contains("NEEDS WORK") {
            Some(Self::NeedsWork)
        } else if upper.contains("SHIP") {
            Some(Self::Ship)
        } else {
            None
        }
    }
}

/// Stored outcome of the most recent implementation review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub verdict: ReviewVerdict,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Epoch milliseconds.
    pub reviewed_at: u64,
}

/// One task record (`crew/tasks/task-N.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// `task-N`, integer-sequential per project.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Epoch milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    /// `git rev-parse HEAD` at start time, for review diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    /// Monotonic across retries; incremented on every start.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<ReviewRecord>,
}

impl Task {
    /// Numeric part of a `task-N` id.
    pub fn number(&self) -> Option<u32> {
        task_number(&self.id)
    }
}

/// Parse the numeric part of a `task-N` id.
pub fn task_number(id: &str) -> Option<u32> {
    id.strip_prefix("task-")?.parse().ok()
}

/// A task is ready iff it is `todo` and every dependency is `done`.
pub fn is_ready(task: &Task, tasks: &BTreeMap<String, Task>) -> bool {
    task.status == TaskStatus::Todo
        && task
            .depends_on
            .iter()
            .all(|dep| tasks.get(dep).is_some_and(|t| t.status == TaskStatus::Done))
}

/// Ready tasks in id order.
pub fn ready_tasks(tasks: &BTreeMap<String, Task>) -> Vec<&Task> {
    let mut ready: Vec<&Task> = tasks.values().filter(|t| is_ready(t, tasks)).collect();
    ready.sort_by_key(|t| t.number().unwrap_or(u32::MAX));
    ready
}

/// Dependency graph validation failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskGraphError {
    #[error("task {task} depends on unknown task {dep}")]
    DependencyNotFound { task: String, dep: String },
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Validate that dependencies reference existing tasks and form no cycle.
pub fn validate_graph(tasks: &BTreeMap<String, Task>) -> Result<(), TaskGraphError> {
    for task in tasks.values() {
        for dep in &task.depends_on {
            if !tasks.contains_key(dep) {
                return Err(TaskGraphError::DependencyNotFound {
                    task: task.id.clone(),
                    dep: dep.clone(),
                });
            }
        }
    }

    // Iterative DFS with an explicit recursion stack.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    for start in tasks.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        marks.insert(start.as_str(), Mark::Visiting);
        while let Some((id, next_dep)) = stack.pop() {
            let deps = &tasks[id].depends_on;
            if let Some(dep) = deps.get(next_dep) {
                stack.push((id, next_dep + 1));
                match marks.get(dep.as_str()) {
                    Some(Mark::Visiting) => {
                        let mut path: Vec<String> =
                            stack.iter().map(|(n, _)| (*n).to_string()).collect();
                        path.push(dep.clone());
                        return Err(TaskGraphError::Cycle { path });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dep.as_str(), Mark::Visiting);
                        stack.push((dep.as_str(), 0));
                    }
                }
            } else {
                marks.insert(id, Mark::Done);
            }
        }
    }
    Ok(())
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            id: String = "task-1",
            title: String = "Test task",
        }
        set {
            status: TaskStatus = TaskStatus::Todo,
            depends_on: Vec<String> = Vec::new(),
            created_at: u64 = 1_000,
            updated_at: u64 = 1_000,
            attempts: u32 = 0,
        }
        option {
            assigned_to: String = None,
            base_commit: String = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
