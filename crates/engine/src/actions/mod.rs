// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crew orchestrator: the `plan` / `work` / `review` / `interview` /
//! `sync` action handlers.
//!
//! Each handler reads plan/task state, fans out child agents through the
//! scheduler with a concurrency cap, parses their outputs, and writes
//! back to the store. Handlers are methods on [`Orchestrator`]; one file
//! per action family.

mod interview;
mod plan;
mod review;
mod sync;
mod work;

pub use interview::InterviewOutcome;
pub use plan::PlanOutcome;
pub use review::{ReviewKind, ReviewOutcome};
pub use sync::SyncOutcome;
pub use work::{TaskOutcome, WorkOutcome, WorkTaskStatus};

use crate::crew_store::{CrewError, CrewStore};
use crate::spawner::{AgentRole, ArtifactSink, OutputBudget, SpawnRequest, Spawner};
use pim_core::{Clock, RunId};
use pim_storage::CrewConfig;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Agent definition names the orchestrator invokes.
pub const SCOUT_AGENT: &str = "scout";
pub const PLANNER_AGENT: &str = "planner";
pub const WORKER_AGENT: &str = "worker";
pub const REVIEWER_AGENT: &str = "reviewer";
pub const ANALYST_AGENT: &str = "analyst";

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("no planner agent is configured")]
    NoPlanner,
    #[error("no worker agent is configured")]
    NoWorker,
    #[error("no reviewer agent is configured")]
    NoReviewer,
    #[error("no analyst agent is configured")]
    NoAnalyst,
    #[error("planner failed: {0}")]
    PlannerFailed(String),
    #[error("analyst failed: {0}")]
    AnalystFailed(String),
    #[error("reviewer failed: {0}")]
    ReviewerFailed(String),
    #[error("every scout failed")]
    AllScoutsFailed,
    #[error("crew actions are not available to crew child processes")]
    CrewChild,
    #[error(transparent)]
    Crew(#[from] CrewError),
}

/// Composes the crew store and the spawner for one project cwd.
pub struct Orchestrator<C: Clock> {
    store: CrewStore<C>,
    spawner: Arc<dyn Spawner>,
    config: CrewConfig,
    clock: C,
    /// Detected once at construction from the crew-child env flag.
    crew_child: bool,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(cwd: PathBuf, spawner: Arc<dyn Spawner>, config: CrewConfig, clock: C) -> Self {
        let crew_child = std::env::var_os(pim_storage::ENV_CREW_CHILD).is_some();
        Self { store: CrewStore::new(cwd, clock.clone()), spawner, config, clock, crew_child }
    }

    /// Override the crew-child detection (host shells embedding the
    /// orchestrator in an already-marked process).
    pub fn set_crew_child(&mut self, flag: bool) {
        self.crew_child = flag;
    }

    pub fn store(&self) -> &CrewStore<C> {
        &self.store
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Spawned children must not orchestrate; the env flag marks them.
    pub fn refuse_crew_child(&self) -> Result<(), OrchestratorError> {
        if self.crew_child {
            return Err(OrchestratorError::CrewChild);
        }
        Ok(())
    }

    fn require_agent(
        &self,
        agent: &str,
        missing: OrchestratorError,
    ) -> Result<(), OrchestratorError> {
        if self.spawner.has_agent(agent) {
            Ok(())
        } else {
            Err(missing)
        }
    }

    fn request(
        &self,
        agent: &str,
        idx: usize,
        role: AgentRole,
        prompt: String,
        max_output: Option<OutputBudget>,
        artifacts: &ArtifactSink,
    ) -> SpawnRequest {
        SpawnRequest {
            agent: agent.to_string(),
            idx,
            role,
            prompt,
            cwd: self.store.cwd().to_path_buf(),
            max_output,
            artifacts: artifacts.clone(),
        }
    }

    /// Run one child through the scheduler.
    async fn run_single(
        &self,
        request: SpawnRequest,
    ) -> Result<crate::spawner::AgentRun, crate::spawner::SpawnError> {
        let agent = request.agent.clone();
        crate::scheduler::run_wave(Arc::clone(&self.spawner), vec![request], 1, |_| {})
            .await
            .into_iter()
            .next()
            .map(|slot| slot.result)
            .unwrap_or_else(|| {
                Err(crate::spawner::SpawnError::Failed {
                    agent,
                    exit_code: None,
                    message: "wave produced no result".into(),
                })
            })
    }

    /// Artifact sink for a new run; prunes runs older than the configured
    /// retention while it is at it.
    fn artifacts_for(&self, run_id: &RunId) -> ArtifactSink {
        if !self.config.artifacts.enabled {
            return ArtifactSink::disabled();
        }
        let artifacts_root = self.store.paths().artifacts_dir();
        self.cleanup_artifacts(&artifacts_root);
        ArtifactSink::at(self.store.paths().run_dir(run_id.as_str()))
    }

    fn cleanup_artifacts(&self, root: &std::path::Path) {
        let cutoff = Duration::from_secs(u64::from(self.config.artifacts.cleanup_days) * 86_400);
        let Ok(entries) = fs::read_dir(root) else {
            return;
        };
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let old = meta
                .modified()
                .ok()
                .and_then(|m| std::time::SystemTime::now().duration_since(m).ok())
                .is_some_and(|age| age > cutoff);
            if old {
                tracing::debug!(run = %entry.path().display(), "pruning old artifact run");
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
