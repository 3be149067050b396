// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `plan` action: PRD → refined plan → task list.

use super::{Orchestrator, OrchestratorError, PLANNER_AGENT, REVIEWER_AGENT, SCOUT_AGENT};
use crate::crew_store::CrewError;
use crate::parse::{
    parse_tasks_json, parse_tasks_markdown, resolve_dependencies, truncate_progress_log,
    TaskDraft,
};
use crate::prd::{discover_prd, PrdDoc};
use crate::scheduler::run_wave;
use crate::spawner::{AgentRole, ArtifactSink};
use pim_core::{validate_graph, Clock, ReviewVerdict, RunId};
use pim_storage::{read_text, write_text_atomic, DirLock, CREW_LOCK_OPTIONS};
use std::sync::Arc;

/// Cap on the planning-progress slice fed back into planner prompts.
const PROGRESS_PROMPT_CAP: usize = 50 * 1024;

#[derive(Debug)]
pub struct PlanOutcome {
    pub prd_path: String,
    pub passes_run: u32,
    pub verdict: Option<ReviewVerdict>,
    pub tasks_created: Vec<String>,
}

impl<C: Clock> Orchestrator<C> {
    /// Create the plan for this project.
    ///
    /// Holds the crew lock for the whole run (rejects with `locked` when
    /// another process is planning here). On planner failure the plan
    /// entry created earlier in the call is rolled back.
    pub async fn plan(&self, explicit_prd: Option<&str>) -> Result<PlanOutcome, OrchestratorError> {
        self.refuse_crew_child()?;
        let lock_path = self.store().paths().plan_lock();
        let _lock = DirLock::acquire(&lock_path, CREW_LOCK_OPTIONS)
            .map_err(|err| OrchestratorError::Crew(err.into()))?;

        let prd = discover_prd(self.store().cwd(), explicit_prd)?;
        self.require_agent(PLANNER_AGENT, OrchestratorError::NoPlanner)?;
        let plan = self.store().create_plan(&prd.rel_path)?;
        tracing::info!(prd = %plan.prd_path, "plan created, starting passes");

        match self.run_planning(&prd).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // Roll back the plan entry created earlier in this call.
                self.store().delete_all_tasks();
                self.store().delete_plan();
                Err(err)
            }
        }
    }

    async fn run_planning(&self, prd: &PrdDoc) -> Result<PlanOutcome, OrchestratorError> {
        let run_id = RunId::new();
        let artifacts = self.artifacts_for(&run_id);
        let scout_notes = self.run_scouts(prd, &artifacts).await?;

        let max_passes = self.config().planning.max_passes.max(1);
        let review_enabled =
            self.config().review.enabled && self.spawner.has_agent(REVIEWER_AGENT);

        let mut passes_run = 0;
        let mut reviews_run = 0;
        let mut verdict = None;
        let mut final_output = String::new();
        for pass in 1..=max_passes {
            passes_run = pass;
            let progress = self.progress_slice();
            let prompt = planner_prompt(prd, &scout_notes, &progress);
            let request = self.request(
                PLANNER_AGENT,
                pass as usize,
                AgentRole::Analyst,
                prompt,
                None,
                &artifacts,
            );
            let run = self
                .run_single(request)
                .await
                .map_err(|err| OrchestratorError::PlannerFailed(err.to_string()))?;

            self.append_progress(&format!("## Planning run (pass {pass})"), &run.output)?;
            final_output = run.output;

            if !review_enabled
                || pass == max_passes
                || reviews_run >= self.config().review.max_iterations
            {
                break;
            }
            reviews_run += 1;
            let request = self.request(
                REVIEWER_AGENT,
                pass as usize,
                AgentRole::Reviewer,
                plan_pass_review_prompt(prd, &final_output),
                None,
                &artifacts,
            );
            let Ok(review) = self.run_single(request).await else {
                // A dead reviewer does not kill planning; ship what we have.
                break;
            };
            let pass_verdict = ReviewVerdict::parse(&review.output);
            verdict = pass_verdict;
            self.append_progress(
                &format!("## Planning run (pass {pass} review)"),
                &review.output,
            )?;
            if pass_verdict == Some(ReviewVerdict::Ship) {
                break;
            }
        }

        let drafts = parse_drafts(&final_output)
            .ok_or_else(|| OrchestratorError::PlannerFailed("no tasks in planner output".into()))?;

        let mut created: Vec<String> = Vec::new();
        for draft in &drafts {
            let task = self.store().create_task(&draft.title, &draft.description, vec![])?;
            created.push(task.id);
        }
        // Second pass: rewrite dependency strings to resolved ids.
        let resolved = resolve_dependencies(&drafts, &created);
        for (id, deps) in created.iter().zip(resolved) {
            if !deps.is_empty() {
                self.store().set_task_dependencies(id, deps)?;
            }
        }
        validate_graph(&self.store().all_tasks())
            .map_err(|err| OrchestratorError::PlannerFailed(err.to_string()))?;

        self.store().write_plan_md(&final_output)?;
        Ok(PlanOutcome {
            prd_path: prd.rel_path.clone(),
            passes_run,
            verdict,
            tasks_created: created,
        })
    }

    /// Optional exploration pass; only `all_scouts_failed` is fatal.
    async fn run_scouts(
        &self,
        prd: &PrdDoc,
        artifacts: &ArtifactSink,
    ) -> Result<String, OrchestratorError> {
        if !self.spawner.has_agent(SCOUT_AGENT) {
            return Ok(String::new());
        }
        let count = self.config().concurrency.scouts.max(1);
        let requests = (0..count)
            .map(|idx| {
                self.request(
                    SCOUT_AGENT,
                    idx,
                    AgentRole::Scout,
                    scout_prompt(prd, idx, count),
                    None,
                    artifacts,
                )
            })
            .collect();
        let slots = run_wave(Arc::clone(&self.spawner), requests, count, |_| {}).await;
        let findings: Vec<String> = slots
            .iter()
            .filter_map(|slot| slot.result.as_ref().ok())
            .map(|run| run.output.clone())
            .collect();
        if findings.is_empty() {
            return Err(OrchestratorError::AllScoutsFailed);
        }
        Ok(findings.join("\n\n---\n\n"))
    }

    fn progress_slice(&self) -> String {
        let content = read_text(&self.store().paths().planning_progress()).unwrap_or_default();
        truncate_progress_log(&content, PROGRESS_PROMPT_CAP)
    }

    fn append_progress(&self, header: &str, body: &str) -> Result<(), OrchestratorError> {
        let path = self.store().paths().planning_progress();
        let mut content = read_text(&path).unwrap_or_default();
        let at = self.clock.epoch_ms();
        content.push_str(&format!("\n{header} [t={at}]\n\n{body}\n"));
        write_text_atomic(&path, &content).map_err(CrewError::from)?;
        Ok(())
    }
}

fn parse_drafts(output: &str) -> Option<Vec<TaskDraft>> {
    if let Some(drafts) = parse_tasks_json(output) {
        if !drafts.is_empty() {
            return Some(drafts);
        }
    }
    let fallback = parse_tasks_markdown(output);
    if fallback.is_empty() {
        None
    } else {
        Some(fallback)
    }
}

fn scout_prompt(prd: &PrdDoc, idx: usize, count: usize) -> String {
    format!(
        "You are scout {} of {count}. Survey the repository relevant to this PRD and report \
         constraints, existing structure, and risks.\n\n# PRD ({})\n\n{}",
        idx + 1,
        prd.rel_path,
        prd.content
    )
}

fn planner_prompt(prd: &PrdDoc, scout_notes: &str, progress: &str) -> String {
    let mut prompt = format!(
        "Break this PRD into implementation tasks. Emit a ```tasks-json``` block containing an \
         array of {{title, description, dependsOn}}.\n\n# PRD ({})\n\n{}",
        prd.rel_path, prd.content
    );
    if !scout_notes.is_empty() {
        prompt.push_str(&format!("\n\n# Scout findings\n\n{scout_notes}"));
    }
    if !progress.is_empty() {
        prompt.push_str(&format!("\n\n# Planning progress so far\n\n{progress}"));
    }
    prompt
}

fn plan_pass_review_prompt(prd: &PrdDoc, planner_output: &str) -> String {
    format!(
        "Review this plan against the PRD. Answer with `Verdict: SHIP`, `Verdict: NEEDS_WORK`, \
         or `Verdict: MAJOR_RETHINK`, then `## Issues` and `## Suggestions` bullet lists.\n\n\
         # PRD ({})\n\n{}\n\n# Plan\n\n{planner_output}",
        prd.rel_path, prd.content
    )
}
