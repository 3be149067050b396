// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crew half of the action surface: task lifecycle and the orchestrator
//! handlers.

use crate::crew_store::CompletionEvidence;
use crate::messenger::Messenger;
use crate::router::{crew_error, orchestrator_error};
use pim_core::{Clock, TaskStatus};
use pim_wire::{ActionInput, ActionResponse, ErrorCode};
use serde_json::json;

fn evidence_from(input: &ActionInput) -> CompletionEvidence {
    CompletionEvidence {
        commits: input.commits.clone(),
        tests: input.tests.clone(),
        prs: input.prs.clone(),
    }
}

fn task_json(task: &pim_core::Task) -> serde_json::Value {
    json!({
        "id": task.id,
        "title": task.title,
        "status": task.status,
        "dependsOn": task.depends_on,
        "assignedTo": task.assigned_to,
        "attempts": task.attempts,
        "blockedReason": task.blocked_reason,
        "summary": task.summary,
    })
}

impl<C: Clock> Messenger<C> {
    fn require_task_id<'a>(&self, input: &'a ActionInput) -> Result<&'a str, ActionResponse> {
        input
            .task_id
            .as_deref()
            .or(input.target.as_deref())
            .ok_or_else(|| {
                ActionResponse::error("a task id is required", ErrorCode::NotFound)
            })
    }

    // ------------------------------------------------------------------
    // task.*
    // ------------------------------------------------------------------

    pub(crate) fn act_task_create(&self, input: &ActionInput) -> ActionResponse {
        let Some(title) = input.title.as_deref().filter(|t| !t.trim().is_empty()) else {
            return ActionResponse::error("task.create requires a title", ErrorCode::NotFound);
        };
        let spec = input.description.as_deref().unwrap_or("");
        let store = self.orchestrator();
        match store.store().create_task(title, spec, input.depends_on.clone()) {
            Ok(task) => ActionResponse::with(
                format!("created {} ({title})", task.id),
                json!({"task": task_json(&task)}),
            ),
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_show(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let store = self.orchestrator();
        match store.store().load_task(id) {
            Ok(task) => {
                let spec = store.store().task_spec(id).unwrap_or_default();
                ActionResponse::with(
                    format!("{} [{}] {}", task.id, task.status, task.title),
                    json!({"task": task_json(&task), "spec": spec, "lastReview": task.last_review}),
                )
            }
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_list(&self) -> ActionResponse {
        let store = self.orchestrator();
        let tasks = store.store().all_tasks();
        if tasks.is_empty() {
            return ActionResponse::with("no tasks", json!({"tasks": []}));
        }
        let lines: Vec<String> = tasks
            .values()
            .map(|t| {
                let deps = if t.depends_on.is_empty() {
                    String::new()
                } else {
                    format!(" (after {})", t.depends_on.join(", "))
                };
                format!("{} [{}] {}{deps}", t.id, t.status, t.title)
            })
            .collect();
        let entries: Vec<_> = tasks.values().map(task_json).collect();
        ActionResponse::with(lines.join("\n"), json!({"tasks": entries}))
    }

    pub(crate) fn act_task_start(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let store = self.orchestrator();
        match store.store().start_task(id, self.name().as_deref()) {
            Ok(task) => ActionResponse::with(
                format!("started {} (attempt {})", task.id, task.attempts),
                json!({"task": task_json(&task), "baseCommit": task.base_commit}),
            ),
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_done(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let store = self.orchestrator();
        match store.store().complete_task(id, input.summary.clone(), evidence_from(input)) {
            Ok(task) => ActionResponse::with(
                format!("completed {}", task.id),
                json!({"task": task_json(&task)}),
            ),
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_block(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let reason = input.reason.as_deref().unwrap_or("blocked");
        let store = self.orchestrator();
        match store.store().block_task(id, reason) {
            Ok(task) => ActionResponse::with(
                format!("blocked {}: {reason}", task.id),
                json!({"task": task_json(&task)}),
            ),
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_unblock(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let store = self.orchestrator();
        match store.store().unblock_task(id) {
            Ok(task) => ActionResponse::with(
                format!("unblocked {}", task.id),
                json!({"task": task_json(&task)}),
            ),
            Err(err) => crew_error(err),
        }
    }

    pub(crate) fn act_task_ready(&self) -> ActionResponse {
        let store = self.orchestrator();
        let ready = store.store().ready();
        let ids: Vec<&str> = ready.iter().map(|t| t.id.as_str()).collect();
        let text = if ids.is_empty() {
            "no tasks are ready".to_string()
        } else {
            format!("ready: {}", ids.join(", "))
        };
        let entries: Vec<_> = ready.iter().map(task_json).collect();
        ActionResponse::with(text, json!({"tasks": entries}))
    }

    pub(crate) fn act_task_reset(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let store = self.orchestrator();
        match store.store().reset_task(id, input.cascade) {
            Ok(reset) => ActionResponse::with(
                format!("reset {}", reset.join(", ")),
                json!({"reset": reset}),
            ),
            Err(err) => crew_error(err),
        }
    }

    // ------------------------------------------------------------------
    // Orchestrator actions
    // ------------------------------------------------------------------

    pub(crate) async fn act_plan(&self, input: &ActionInput) -> ActionResponse {
        let orchestrator = self.orchestrator();
        match orchestrator.plan(input.prd.as_deref()).await {
            Ok(outcome) => ActionResponse::with(
                format!(
                    "plan created from {} ({} tasks, {} pass(es))",
                    outcome.prd_path,
                    outcome.tasks_created.len(),
                    outcome.passes_run,
                ),
                json!({
                    "prdPath": outcome.prd_path,
                    "tasks": outcome.tasks_created,
                    "passes": outcome.passes_run,
                    "verdict": outcome.verdict.map(|v| v.to_string()),
                }),
            ),
            Err(err) => orchestrator_error(err),
        }
    }

    pub(crate) async fn act_work(&self, input: &ActionInput) -> ActionResponse {
        let orchestrator = self.orchestrator();
        let mut state = self.autonomous.lock().clone();
        let result = orchestrator.work(input.autonomous, &mut state).await;
        *self.autonomous.lock() = state.clone();

        match result {
            Ok(outcome) => {
                let summary: Vec<String> = outcome
                    .wave
                    .iter()
                    .map(|o| format!("{} {}", o.task_id, o.status))
                    .collect();
                if outcome.continue_requested {
                    // Continuation steer: the host turn loop re-invokes
                    // `work` on the next agent step.
                    self.host.steer("crew work wave finished; continue with action=work autonomous=true".to_string());
                }
                let wave: Vec<_> = outcome
                    .wave
                    .iter()
                    .map(|o| {
                        json!({"taskId": o.task_id, "status": o.status.to_string(), "error": o.error})
                    })
                    .collect();
                ActionResponse::with(
                    if summary.is_empty() {
                        "no ready tasks".to_string()
                    } else {
                        format!("wave finished: {}", summary.join(", "))
                    },
                    json!({
                        "wave": wave,
                        "autonomous": outcome.autonomous,
                        "continue": outcome.continue_requested,
                    }),
                )
            }
            Err(err) => orchestrator_error(err),
        }
    }

    pub(crate) async fn act_review(&self, input: &ActionInput) -> ActionResponse {
        let orchestrator = self.orchestrator();
        let target = input.target.as_deref().or(input.task_id.as_deref());
        match orchestrator.review(target).await {
            Ok(outcome) => ActionResponse::with(
                format!(
                    "review verdict: {} ({} issue(s))",
                    outcome.review.verdict,
                    outcome.review.issues.len(),
                ),
                json!({
                    "target": outcome.target,
                    "verdict": outcome.review.verdict.to_string(),
                    "summary": outcome.review.summary,
                    "issues": outcome.review.issues,
                    "suggestions": outcome.review.suggestions,
                }),
            ),
            Err(err) => orchestrator_error(err),
        }
    }

    pub(crate) async fn act_interview(&self) -> ActionResponse {
        let orchestrator = self.orchestrator();
        match orchestrator.interview().await {
            Ok(outcome) => ActionResponse::with(
                format!("generated {} question(s)", outcome.questions.len()),
                json!({"questions": outcome.questions, "path": outcome.path}),
            ),
            Err(err) => orchestrator_error(err),
        }
    }

    pub(crate) async fn act_sync(&self, input: &ActionInput) -> ActionResponse {
        let id = match self.require_task_id(input) {
            Ok(id) => id.to_string(),
            Err(resp) => return resp,
        };
        let orchestrator = self.orchestrator();
        match orchestrator.sync(&id).await {
            Ok(outcome) => ActionResponse::with(
                if outcome.updated.is_empty() {
                    "no dependent specs needed amendments".to_string()
                } else {
                    format!("amended {}", outcome.updated.join(", "))
                },
                json!({"updated": outcome.updated}),
            ),
            Err(err) => orchestrator_error(err),
        }
    }

    // ------------------------------------------------------------------
    // crew.*
    // ------------------------------------------------------------------

    pub(crate) fn act_crew_status(&self) -> ActionResponse {
        let store = self.orchestrator();
        let Some(plan) = store.store().load_plan() else {
            return ActionResponse::error("no plan in this project", ErrorCode::NoPlan);
        };
        let tasks = store.store().all_tasks();
        let count = |status: TaskStatus| tasks.values().filter(|t| t.status == status).count();
        let auto = self.autonomous.lock().clone();
        ActionResponse::with(
            format!(
                "plan {}: {}/{} done ({} in progress, {} blocked)",
                plan.prd_path,
                count(TaskStatus::Done),
                tasks.len(),
                count(TaskStatus::InProgress),
                count(TaskStatus::Blocked),
            ),
            json!({
                "plan": plan,
                "todo": count(TaskStatus::Todo),
                "inProgress": count(TaskStatus::InProgress),
                "done": count(TaskStatus::Done),
                "blocked": count(TaskStatus::Blocked),
                "autonomous": auto,
            }),
        )
    }

    pub(crate) fn act_crew_agents(&self) -> ActionResponse {
        let roles = [
            ("scout", crate::actions::SCOUT_AGENT),
            ("planner", crate::actions::PLANNER_AGENT),
            ("worker", crate::actions::WORKER_AGENT),
            ("reviewer", crate::actions::REVIEWER_AGENT),
            ("analyst", crate::actions::ANALYST_AGENT),
        ];
        let entries: Vec<_> = roles
            .iter()
            .map(|(label, agent)| {
                json!({"role": label, "agent": agent, "available": self.spawner.has_agent(agent)})
            })
            .collect();
        let available: Vec<&str> = roles
            .iter()
            .filter(|(_, agent)| self.spawner.has_agent(agent))
            .map(|(label, _)| *label)
            .collect();
        ActionResponse::with(
            format!("available crew agents: {}", available.join(", ")),
            json!({"agents": entries}),
        )
    }

    pub(crate) fn act_crew_install(&self) -> ActionResponse {
        let cwd = self.session.cwd.to_string_lossy().into_owned();
        self.persist_config(move |config| {
            config.auto_register = true;
            if !config.auto_register_paths.iter().any(|p| *p == cwd) {
                config.auto_register_paths.push(cwd.clone());
            }
        })
    }

    pub(crate) fn act_crew_uninstall(&self) -> ActionResponse {
        let cwd = self.session.cwd.to_string_lossy().into_owned();
        self.persist_config(move |config| {
            config.auto_register_paths.retain(|p| *p != cwd);
        })
    }

    pub(crate) fn act_crew_validate(&self) -> ActionResponse {
        let store = self.orchestrator();
        match store.store().validate() {
            Ok(report) => {
                let text = if report.problems.is_empty() {
                    format!("{} task(s) validated, no problems", report.task_count)
                } else {
                    format!(
                        "{} task(s) validated: {}",
                        report.task_count,
                        report.problems.join("; ")
                    )
                };
                ActionResponse::with(text, json!({"report": report}))
            }
            Err(err) => crew_error(err),
        }
    }
}
