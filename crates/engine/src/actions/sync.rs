// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `sync` action: after a task completes, propose spec amendments to
//! its dependents (append-only; specs are never replaced).

use super::{Orchestrator, OrchestratorError, ANALYST_AGENT};
use crate::parse::parse_sync_updates;
use crate::spawner::AgentRole;
use pim_core::{Clock, RunId, TaskStatus};

#[derive(Debug)]
pub struct SyncOutcome {
    /// Dependent task ids whose specs received amendments.
    pub updated: Vec<String>,
}

impl<C: Clock> Orchestrator<C> {
    pub async fn sync(&self, completed_id: &str) -> Result<SyncOutcome, OrchestratorError> {
        self.refuse_crew_child()?;
        self.store().require_plan()?;
        let completed = self.store().load_task(completed_id)?;
        if completed.status != TaskStatus::Done {
            return Err(OrchestratorError::Crew(crate::crew_store::CrewError::InvalidStatus {
                id: completed_id.to_string(),
                actual: completed.status,
                expected: TaskStatus::Done,
            }));
        }

        let tasks = self.store().all_tasks();
        let dependents: Vec<String> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Todo)
            .filter(|t| t.depends_on.iter().any(|d| d == completed_id))
            .map(|t| t.id.clone())
            .collect();
        if dependents.is_empty() {
            return Ok(SyncOutcome { updated: Vec::new() });
        }
        self.require_agent(ANALYST_AGENT, OrchestratorError::NoAnalyst)?;

        let mut dependent_specs = String::new();
        for id in &dependents {
            let spec = self.store().task_spec(id).unwrap_or_default();
            dependent_specs.push_str(&format!("## {id}\n\n{spec}\n\n"));
        }
        let prompt = format!(
            "Task {completed_id} just completed: {}\n\nSummary: {}\n\nPropose spec amendments \
             for the dependent tasks below. For each task that needs one, emit a \
             `### Updated: <task-id>` block with a `New content:` section to append. Only \
             list tasks that genuinely need changes.\n\n# Dependent task specs\n\n{dependent_specs}",
            completed.title,
            completed.summary.as_deref().unwrap_or("(none)"),
        );

        let run_id = RunId::new();
        let artifacts = self.artifacts_for(&run_id);
        let request = self.request(ANALYST_AGENT, 0, AgentRole::Syncer, prompt, None, &artifacts);
        let run = self
            .run_single(request)
            .await
            .map_err(|err| OrchestratorError::AnalystFailed(err.to_string()))?;

        let mut updated = Vec::new();
        for (task_id, amendment) in parse_sync_updates(&run.output) {
            // Only dependent todo tasks may be amended.
            if !dependents.contains(&task_id) {
                tracing::warn!(%task_id, "sync proposed amendment for non-dependent task, skipping");
                continue;
            }
            let header = format!("## Amendment after {completed_id}\n\n{amendment}");
            self.store().append_task_spec(&task_id, &header)?;
            updated.push(task_id);
        }
        Ok(SyncOutcome { updated })
    }
}
