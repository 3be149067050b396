// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `work` action: one wave of workers over ready tasks, plus the
//! autonomous wave loop.

use super::{Orchestrator, OrchestratorError, WORKER_AGENT};
use crate::autonomous::{AutonomousState, StopReason, WaveResult};
use crate::scheduler::run_wave;
use crate::spawner::AgentRole;
use pim_core::{Clock, RunId, Task, TaskStatus};
use std::sync::Arc;

/// Cap on the plan-spec slice included in worker prompts.
const PLAN_SLICE_CAP: usize = 10 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkTaskStatus {
    Succeeded,
    Blocked,
    Failed,
}

pim_core::simple_display! {
    WorkTaskStatus {
        Succeeded => "succeeded",
        Blocked => "blocked",
        Failed => "failed",
    }
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub task_id: String,
    pub status: WorkTaskStatus,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct WorkOutcome {
    pub wave: Vec<TaskOutcome>,
    /// Set when this call ran (or continued) an autonomous session.
    pub autonomous: Option<AutonomousState>,
    /// The host should re-invoke `work` on the next agent step.
    pub continue_requested: bool,
}

impl<C: Clock> Orchestrator<C> {
    /// Run one wave of workers over ready tasks.
    ///
    /// With `autonomous`, the session state in `state` is initialized or
    /// resumed, the wave is recorded, and the stop conditions are
    /// evaluated; `continue_requested` asks the host to call again.
    pub async fn work(
        &self,
        autonomous: bool,
        state: &mut Option<AutonomousState>,
    ) -> Result<WorkOutcome, OrchestratorError> {
        self.refuse_crew_child()?;
        self.store().require_plan()?;
        self.require_agent(WORKER_AGENT, OrchestratorError::NoWorker)?;

        if autonomous {
            let needs_init = state
                .as_ref()
                .map(|s| !s.active || s.cwd != self.store().cwd())
                .unwrap_or(true);
            if needs_init {
                *state = Some(AutonomousState::start(
                    self.store().cwd().to_path_buf(),
                    self.clock.epoch_ms(),
                ));
            }
        }

        let mut ready = self.store().ready();
        if autonomous {
            // Respect the per-task retry cap in autonomous mode.
            let cap = self.config().work.max_attempts_per_task;
            ready.retain(|task| task.attempts < cap);
        }
        let workers = self.config().concurrency.workers.max(1);
        ready.truncate(workers);

        let mut outcomes = Vec::new();
        if !ready.is_empty() {
            outcomes = self.run_worker_wave(&ready, autonomous).await?;
        }

        let mut continue_requested = false;
        if autonomous {
            if let Some(auto) = state.as_mut() {
                auto.record_wave(WaveResult {
                    wave: 0,
                    attempted: outcomes.iter().map(|o| o.task_id.clone()).collect(),
                    succeeded: ids_with(&outcomes, WorkTaskStatus::Succeeded),
                    failed: ids_with(&outcomes, WorkTaskStatus::Failed),
                    blocked: ids_with(&outcomes, WorkTaskStatus::Blocked),
                    at: self.clock.epoch_ms(),
                });
                continue_requested = self.evaluate_continuation(auto);
            }
        }

        let session = if autonomous { state.clone() } else { None };
        Ok(WorkOutcome { wave: outcomes, autonomous: session, continue_requested })
    }

    async fn run_worker_wave(
        &self,
        ready: &[Task],
        autonomous: bool,
    ) -> Result<Vec<TaskOutcome>, OrchestratorError> {
        let run_id = RunId::new();
        let artifacts = self.artifacts_for(&run_id);
        let plan_slice = self.plan_slice();

        // Start every task first so the wave sees consistent state and
        // prompts carry the bumped attempt count.
        let mut requests = Vec::new();
        for (idx, task) in ready.iter().enumerate() {
            let started = self.store().start_task(&task.id, Some(WORKER_AGENT))?;
            let spec = self.store().task_spec(&task.id).unwrap_or_default();
            let prompt = worker_prompt(&started, &spec, &plan_slice);
            let request =
                self.request(WORKER_AGENT, idx, AgentRole::Worker, prompt, None, &artifacts);
            requests.push((started.id.clone(), request));
        }

        let slots = run_wave(
            Arc::clone(&self.spawner),
            requests.iter().map(|(_, r)| r.clone()).collect(),
            self.config().concurrency.workers.max(1),
            |slot| {
                tracing::info!(agent = %slot.request.agent, idx = slot.request.idx, "worker finished");
            },
        )
        .await;

        let mut outcomes = Vec::new();
        for slot in slots {
            let Some((task_id, _)) = requests.iter().find(|(_, r)| r.idx == slot.request.idx)
            else {
                continue;
            };
            outcomes.push(self.classify(task_id, slot.result, autonomous)?);
        }
        outcomes.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(outcomes)
    }

    /// Classify a task by its post-execution status.
    fn classify(
        &self,
        task_id: &str,
        result: Result<crate::spawner::AgentRun, crate::spawner::SpawnError>,
        autonomous: bool,
    ) -> Result<TaskOutcome, OrchestratorError> {
        let task = self.store().load_task(task_id)?;
        let outcome = match (task.status, result) {
            // The worker child transitioned the task itself.
            (TaskStatus::Done, _) => TaskOutcome {
                task_id: task_id.to_string(),
                status: WorkTaskStatus::Succeeded,
                error: None,
            },
            (TaskStatus::Blocked, _) => TaskOutcome {
                task_id: task_id.to_string(),
                status: WorkTaskStatus::Blocked,
                error: task.blocked_reason.clone(),
            },
            // Worker returned cleanly without transitioning: record the
            // completion on its behalf, summarized by its output tail.
            (TaskStatus::InProgress, Ok(run)) => {
                let summary = run.output.lines().rev().find(|l| !l.trim().is_empty());
                self.store().complete_task(
                    task_id,
                    summary.map(str::to_string),
                    Default::default(),
                )?;
                TaskOutcome {
                    task_id: task_id.to_string(),
                    status: WorkTaskStatus::Succeeded,
                    error: None,
                }
            }
            (TaskStatus::InProgress, Err(err)) if autonomous => {
                // Autonomous runs must not wedge on in_progress tasks.
                self.store().block_task(task_id, &err.to_string())?;
                TaskOutcome {
                    task_id: task_id.to_string(),
                    status: WorkTaskStatus::Blocked,
                    error: Some(err.to_string()),
                }
            }
            (_, Err(err)) => TaskOutcome {
                task_id: task_id.to_string(),
                status: WorkTaskStatus::Failed,
                error: Some(err.to_string()),
            },
            (status, Ok(_)) => TaskOutcome {
                task_id: task_id.to_string(),
                status: WorkTaskStatus::Failed,
                error: Some(format!("unexpected post-execution status {status}")),
            },
        };
        Ok(outcome)
    }

    /// Stop conditions, in order: completed, blocked, wave cap.
    fn evaluate_continuation(&self, auto: &mut AutonomousState) -> bool {
        let tasks = self.store().all_tasks();
        let all_done =
            !tasks.is_empty() && tasks.values().all(|t| t.status == TaskStatus::Done);
        if all_done {
            auto.stop(StopReason::Completed, self.clock.epoch_ms());
            return false;
        }
        let in_progress =
            tasks.values().any(|t| t.status == TaskStatus::InProgress);
        if self.store().ready().is_empty() && !in_progress {
            auto.stop(StopReason::Blocked, self.clock.epoch_ms());
            return false;
        }
        if auto.completed_waves() >= self.config().work.max_waves {
            auto.stop(StopReason::Manual, self.clock.epoch_ms());
            return false;
        }
        true
    }

    fn plan_slice(&self) -> String {
        let plan = self.store().plan_md().unwrap_or_default();
        if plan.len() <= PLAN_SLICE_CAP {
            return plan;
        }
        let mut cut = PLAN_SLICE_CAP;
        while cut > 0 && !plan.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}\n[... plan truncated]", &plan[..cut])
    }
}

fn ids_with(outcomes: &[TaskOutcome], status: WorkTaskStatus) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.status == status)
        .map(|o| o.task_id.clone())
        .collect()
}

fn worker_prompt(task: &Task, spec: &str, plan_slice: &str) -> String {
    let mut prompt = format!(
        "Implement task {} ({}): attempt {}.\n\n# Task spec\n\n{spec}\n",
        task.id, task.title, task.attempts
    );
    if !task.depends_on.is_empty() {
        prompt.push_str(&format!(
            "\nDepends on (already done): {}\n",
            task.depends_on.join(", ")
        ));
    }
    if task.attempts > 1 {
        if let Some(review) = &task.last_review {
            prompt.push_str(&format!(
                "\n# Review feedback from the previous attempt ({})\n\n{}\n",
                review.verdict, review.summary
            ));
            for issue in &review.issues {
                prompt.push_str(&format!("- Issue: {issue}\n"));
            }
            for suggestion in &review.suggestions {
                prompt.push_str(&format!("- Suggestion: {suggestion}\n"));
            }
        }
    }
    if !plan_slice.is_empty() {
        prompt.push_str(&format!("\n# Plan context\n\n{plan_slice}\n"));
    }
    prompt
}
