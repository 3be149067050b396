// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan and task persistence for one project.
//!
//! Layout under `<project>/.pi/messenger/crew/`: `plan.json` + `plan.md`
//! for the plan, `tasks/task-N.{json,md}` per task, `blocks/task-N.md`
//! for blocked-reason notes. At most one plan per project; task ids are
//! integer-sequential, allocated by scanning existing files.

use crate::git;
use pim_core::{
    is_ready, task_number, validate_graph, Clock, Plan, Task, TaskGraphError, TaskStatus,
};
use pim_storage::{read_json, read_text, write_json_atomic, write_text_atomic};
use pim_storage::{LockError, ProjectPaths, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("a plan already exists for {prd_path}")]
    PlanExists { prd_path: String },
    #[error("no plan in this project")]
    NoPlan,
    #[error("no PRD found")]
    NoPrd,
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {id} is {actual}, expected {expected}")]
    InvalidStatus { id: String, actual: TaskStatus, expected: TaskStatus },
    #[error("task {id} has unmet dependencies: {}", missing.join(", "))]
    UnmetDependencies { id: String, missing: Vec<String> },
    #[error(transparent)]
    Graph(#[from] TaskGraphError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evidence attached when completing a task.
#[derive(Debug, Clone, Default)]
pub struct CompletionEvidence {
    pub commits: Vec<String>,
    pub tests: Vec<String>,
    pub prs: Vec<String>,
}

/// Outcome of `validate`: what was checked and what was repaired.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationReport {
    pub task_count: usize,
    pub counters_fixed: bool,
    pub graph_ok: bool,
    pub problems: Vec<String>,
}

/// Store accessor bound to one project cwd.
pub struct CrewStore<C: Clock> {
    cwd: PathBuf,
    paths: ProjectPaths,
    clock: C,
}

impl<C: Clock> CrewStore<C> {
    pub fn new(cwd: PathBuf, clock: C) -> Self {
        let paths = ProjectPaths::for_cwd(&cwd);
        Self { cwd, paths, clock }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    // ------------------------------------------------------------------
    // Plan
    // ------------------------------------------------------------------

    /// Create the project plan. At most one per project.
    pub fn create_plan(&self, prd_path: &str) -> Result<Plan, CrewError> {
        if let Some(existing) = self.load_plan() {
            return Err(CrewError::PlanExists { prd_path: existing.prd_path });
        }
        let now = self.clock.epoch_ms();
        let plan = Plan {
            prd_path: prd_path.to_string(),
            created_at: now,
            updated_at: now,
            task_count: 0,
            completed_count: 0,
        };
        write_json_atomic(&self.paths.plan_json(), &plan)?;
        Ok(plan)
    }

    pub fn load_plan(&self) -> Option<Plan> {
        read_json(&self.paths.plan_json())
    }

    pub fn require_plan(&self) -> Result<Plan, CrewError> {
        self.load_plan().ok_or(CrewError::NoPlan)
    }

    /// Roll back a plan created earlier in the same failed call.
    pub fn delete_plan(&self) {
        let _ = fs::remove_file(self.paths.plan_json());
        let _ = fs::remove_file(self.paths.plan_md());
    }

    pub fn write_plan_md(&self, content: &str) -> Result<(), CrewError> {
        write_text_atomic(&self.paths.plan_md(), content)?;
        Ok(())
    }

    pub fn plan_md(&self) -> Option<String> {
        read_text(&self.paths.plan_md())
    }

    fn save_plan(&self, plan: &mut Plan) -> Result<(), CrewError> {
        plan.updated_at = self.clock.epoch_ms();
        write_json_atomic(&self.paths.plan_json(), plan)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Allocate the next integer-sequential task id.
    fn next_task_id(&self) -> String {
        let max = self
            .all_tasks()
            .keys()
            .filter_map(|id| task_number(id))
            .max()
            .unwrap_or(0);
        format!("task-{}", max + 1)
    }

    /// Create a task with its spec text. Dependencies must exist.
    pub fn create_task(
        &self,
        title: &str,
        spec: &str,
        depends_on: Vec<String>,
    ) -> Result<Task, CrewError> {
        let mut plan = self.require_plan()?;
        let tasks = self.all_tasks();
        for dep in &depends_on {
            if !tasks.contains_key(dep) {
                return Err(CrewError::Graph(TaskGraphError::DependencyNotFound {
                    task: title.to_string(),
                    dep: dep.clone(),
                }));
            }
        }

        let now = self.clock.epoch_ms();
        let task = Task {
            id: self.next_task_id(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            depends_on,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        self.save_task(&task)?;
        write_text_atomic(&self.paths.task_md(&task.id), spec)?;

        plan.task_count += 1;
        self.save_plan(&mut plan)?;
        tracing::info!(id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    pub fn load_task(&self, id: &str) -> Result<Task, CrewError> {
        read_json(&self.paths.task_json(id)).ok_or_else(|| CrewError::NotFound(id.to_string()))
    }

    pub fn task_spec(&self, id: &str) -> Option<String> {
        read_text(&self.paths.task_md(id))
    }

    /// Append amendment content to a task's spec file (never replaces).
    pub fn append_task_spec(&self, id: &str, amendment: &str) -> Result<(), CrewError> {
        self.load_task(id)?;
        let current = self.task_spec(id).unwrap_or_default();
        let updated = format!("{}\n\n{amendment}\n", current.trim_end());
        write_text_atomic(&self.paths.task_md(id), &updated)?;
        Ok(())
    }

    pub fn all_tasks(&self) -> BTreeMap<String, Task> {
        let Ok(entries) = fs::read_dir(self.paths.tasks_dir()) else {
            return BTreeMap::new();
        };
        entries
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
            .filter_map(|e| read_json::<Task>(&e.path()))
            .map(|t| (t.id.clone(), t))
            .collect()
    }

    /// Ready tasks: `todo` with every dependency `done`, in id order.
    pub fn ready(&self) -> Vec<Task> {
        let tasks = self.all_tasks();
        pim_core::ready_tasks(&tasks).into_iter().cloned().collect()
    }

    fn save_task(&self, task: &Task) -> Result<(), CrewError> {
        write_json_atomic(&self.paths.task_json(&task.id), task)?;
        Ok(())
    }

    fn mutate_task(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Task, CrewError> {
        let mut task = self.load_task(id)?;
        mutate(&mut task);
        task.updated_at = self.clock.epoch_ms();
        self.save_task(&task)?;
        Ok(task)
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// `todo → in_progress`; records the base git commit and bumps the
    /// attempt counter (monotonic across retries).
    pub fn start_task(&self, id: &str, agent: Option<&str>) -> Result<Task, CrewError> {
        let task = self.load_task(id)?;
        if task.status != TaskStatus::Todo {
            return Err(CrewError::InvalidStatus {
                id: id.to_string(),
                actual: task.status,
                expected: TaskStatus::Todo,
            });
        }
        let tasks = self.all_tasks();
        if !is_ready(&task, &tasks) {
            let missing = task
                .depends_on
                .iter()
                .filter(|dep| {
                    tasks.get(*dep).map(|t| t.status) != Some(TaskStatus::Done)
                })
                .cloned()
                .collect();
            return Err(CrewError::UnmetDependencies { id: id.to_string(), missing });
        }

        let base = git::head_commit(&self.cwd);
        let now = self.clock.epoch_ms();
        self.mutate_task(id, |task| {
            task.status = TaskStatus::InProgress;
            task.started_at = Some(now);
            task.base_commit = base;
            task.assigned_to = agent.map(str::to_string);
            task.attempts += 1;
        })
    }

    /// `in_progress → done`; bumps the plan's completed counter.
    pub fn complete_task(
        &self,
        id: &str,
        summary: Option<String>,
        evidence: CompletionEvidence,
    ) -> Result<Task, CrewError> {
        self.expect_status(id, TaskStatus::InProgress)?;
        let now = self.clock.epoch_ms();
        let task = self.mutate_task(id, |task| {
            task.status = TaskStatus::Done;
            task.completed_at = Some(now);
            task.summary = summary;
            task.commits = evidence.commits;
            task.tests = evidence.tests;
            task.prs = evidence.prs;
        })?;
        let mut plan = self.require_plan()?;
        plan.completed_count += 1;
        self.save_plan(&mut plan)?;
        Ok(task)
    }

    /// `in_progress → blocked`; writes `blocks/<id>.md`.
    pub fn block_task(&self, id: &str, reason: &str) -> Result<Task, CrewError> {
        self.expect_status(id, TaskStatus::InProgress)?;
        write_text_atomic(&self.paths.block_md(id), reason)?;
        self.mutate_task(id, |task| {
            task.status = TaskStatus::Blocked;
            task.blocked_reason = Some(reason.to_string());
        })
    }

    /// `blocked → todo`.
    pub fn unblock_task(&self, id: &str) -> Result<Task, CrewError> {
        self.expect_status(id, TaskStatus::Blocked)?;
        let _ = fs::remove_file(self.paths.block_md(id));
        self.mutate_task(id, |task| {
            task.status = TaskStatus::Todo;
            task.blocked_reason = None;
        })
    }

    /// `any → todo`. With `cascade`, dependents are reset too.
    pub fn reset_task(&self, id: &str, cascade: bool) -> Result<Vec<String>, CrewError> {
        let task = self.load_task(id)?;
        let was_done = task.status == TaskStatus::Done;
        self.mutate_task(id, |task| {
            task.status = TaskStatus::Todo;
            task.started_at = None;
            task.completed_at = None;
            task.assigned_to = None;
            task.summary = None;
            task.blocked_reason = None;
        })?;
        let _ = fs::remove_file(self.paths.block_md(id));
        if was_done {
            let mut plan = self.require_plan()?;
            plan.completed_count = plan.completed_count.saturating_sub(1);
            self.save_plan(&mut plan)?;
        }

        let mut reset_ids = vec![id.to_string()];
        if cascade {
            let tasks = self.all_tasks();
            let dependents: Vec<String> = tasks
                .values()
                .filter(|t| t.depends_on.iter().any(|d| d == id))
                .filter(|t| t.status != TaskStatus::Todo)
                .map(|t| t.id.clone())
                .collect();
            for dep_id in dependents {
                reset_ids.extend(self.reset_task(&dep_id, true)?);
            }
        }
        Ok(reset_ids)
    }

    /// Rewrite a task's dependency list (planner second pass).
    pub fn set_task_dependencies(&self, id: &str, depends_on: Vec<String>) -> Result<Task, CrewError> {
        let tasks = self.all_tasks();
        for dep in &depends_on {
            if !tasks.contains_key(dep) {
                return Err(CrewError::Graph(TaskGraphError::DependencyNotFound {
                    task: id.to_string(),
                    dep: dep.clone(),
                }));
            }
        }
        self.mutate_task(id, |task| task.depends_on = depends_on)
    }

    /// Store the outcome of the latest implementation review.
    pub fn set_last_review(&self, id: &str, review: pim_core::ReviewRecord) -> Result<Task, CrewError> {
        self.mutate_task(id, |task| task.last_review = Some(review))
    }

    /// Remove every task file (plan rollback).
    pub fn delete_all_tasks(&self) {
        let _ = fs::remove_dir_all(self.paths.tasks_dir());
    }

    fn expect_status(&self, id: &str, expected: TaskStatus) -> Result<(), CrewError> {
        let task = self.load_task(id)?;
        if task.status != expected {
            return Err(CrewError::InvalidStatus {
                id: id.to_string(),
                actual: task.status,
                expected,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Resync plan counters and check the dependency graph.
    pub fn validate(&self) -> Result<ValidationReport, CrewError> {
        let mut plan = self.require_plan()?;
        let tasks = self.all_tasks();
        let mut report = ValidationReport {
            task_count: tasks.len(),
            graph_ok: true,
            ..Default::default()
        };

        let done = tasks.values().filter(|t| t.status == TaskStatus::Done).count();
        if plan.task_count != tasks.len() || plan.completed_count != done {
            report.counters_fixed = true;
            report.problems.push(format!(
                "counters resynced: task_count {} -> {}, completed_count {} -> {done}",
                plan.task_count,
                tasks.len(),
                plan.completed_count
            ));
            plan.task_count = tasks.len();
            plan.completed_count = done;
            self.save_plan(&mut plan)?;
        }

        if let Err(err) = validate_graph(&tasks) {
            report.graph_ok = false;
            report.problems.push(err.to_string());
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "crew_store_tests.rs"]
mod tests;
