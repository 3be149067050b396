// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `review` action: implementation review of a task's diff, or a
//! whole-plan review.

use super::{Orchestrator, OrchestratorError, REVIEWER_AGENT};
use crate::git;
use crate::parse::{parse_review, ReviewParse};
use crate::spawner::AgentRole;
use pim_core::{short, Clock, ReviewRecord, RunId, Task};

/// Cap on the diff included in review prompts.
const DIFF_CAP: usize = 50 * 1024;

/// Cap on the per-task spec preview in plan reviews.
const SPEC_PREVIEW: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Plan,
    Implementation,
}

#[derive(Debug)]
pub struct ReviewOutcome {
    pub kind: ReviewKind,
    /// Task id for implementation reviews.
    pub target: Option<String>,
    pub review: ReviewParse,
}

impl<C: Clock> Orchestrator<C> {
    /// Review a task implementation (`target` = `task-N`) or the plan.
    pub async fn review(&self, target: Option<&str>) -> Result<ReviewOutcome, OrchestratorError> {
        self.refuse_crew_child()?;
        self.require_agent(REVIEWER_AGENT, OrchestratorError::NoReviewer)?;
        match target {
            Some(task_id) if task_id.starts_with("task-") => {
                self.review_implementation(task_id).await
            }
            _ => self.review_plan().await,
        }
    }

    async fn review_implementation(
        &self,
        task_id: &str,
    ) -> Result<ReviewOutcome, OrchestratorError> {
        let plan = self.store().require_plan()?;
        let task = self.store().load_task(task_id)?;
        let spec = self.store().task_spec(task_id).unwrap_or_default();

        let cwd = self.store().cwd();
        let (diff, log) = match &task.base_commit {
            Some(base) => (
                git::diff_since(cwd, base, DIFF_CAP).unwrap_or_default(),
                git::log_since(cwd, base).unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        let prompt = implementation_prompt(&task, &spec, &plan.prd_path, &diff, &log);
        let review = self.run_reviewer(prompt).await?;

        // Stored on the task so the next worker attempt sees the issues.
        self.store().set_last_review(
            task_id,
            ReviewRecord {
                verdict: review.verdict,
                summary: review.summary.clone(),
                issues: review.issues.clone(),
                suggestions: review.suggestions.clone(),
                reviewed_at: self.clock.epoch_ms(),
            },
        )?;

        Ok(ReviewOutcome {
            kind: ReviewKind::Implementation,
            target: Some(task_id.to_string()),
            review,
        })
    }

    async fn review_plan(&self) -> Result<ReviewOutcome, OrchestratorError> {
        let plan = self.store().require_plan()?;
        let plan_spec = self.store().plan_md().unwrap_or_default();
        let tasks = self.store().all_tasks();

        let mut task_summaries = String::new();
        for task in tasks.values() {
            let preview = self.store().task_spec(&task.id).unwrap_or_default();
            task_summaries.push_str(&format!(
                "- {} [{}] {}: {}\n",
                task.id,
                task.status,
                task.title,
                short(preview.trim(), SPEC_PREVIEW)
            ));
        }

        let prompt = format!(
            "Review this plan for {}. Answer with `Verdict: SHIP`, `Verdict: NEEDS_WORK`, or \
             `Verdict: MAJOR_RETHINK`, then `## Issues` and `## Suggestions` bullet lists.\n\n\
             # Plan\n\n{plan_spec}\n\n# Tasks\n\n{task_summaries}",
            plan.prd_path
        );
        let review = self.run_reviewer(prompt).await?;
        Ok(ReviewOutcome { kind: ReviewKind::Plan, target: None, review })
    }

    async fn run_reviewer(&self, prompt: String) -> Result<ReviewParse, OrchestratorError> {
        let run_id = RunId::new();
        let artifacts = self.artifacts_for(&run_id);
        let request = self.request(REVIEWER_AGENT, 0, AgentRole::Reviewer, prompt, None, &artifacts);
        let run = self
            .run_single(request)
            .await
            .map_err(|err| OrchestratorError::ReviewerFailed(err.to_string()))?;
        parse_review(&run.output).ok_or_else(|| {
            OrchestratorError::ReviewerFailed("reviewer output carried no verdict".into())
        })
    }
}

fn implementation_prompt(
    task: &Task,
    spec: &str,
    prd_path: &str,
    diff: &str,
    log: &str,
) -> String {
    let mut prompt = format!(
        "Review the implementation of {} ({}) against its spec. The PRD is at {prd_path}. \
         Answer with `Verdict: SHIP`, `Verdict: NEEDS_WORK`, or `Verdict: MAJOR_RETHINK`, then \
         `## Issues` and `## Suggestions` bullet lists.\n\n# Task spec\n\n{spec}\n",
        task.id, task.title
    );
    if !log.is_empty() {
        prompt.push_str(&format!("\n# Commits\n\n{log}\n"));
    }
    if !diff.is_empty() {
        prompt.push_str(&format!("\n# Diff\n\n```diff\n{diff}\n```\n"));
    }
    prompt
}
