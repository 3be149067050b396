// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `interview` action: generate clarifying questions from the PRD or
//! plan for the host's interview tool.

use super::{Orchestrator, OrchestratorError, ANALYST_AGENT};
use crate::parse::{parse_interview, InterviewQuestion};
use crate::prd::discover_prd;
use crate::spawner::AgentRole;
use pim_core::{Clock, RunId};
use pim_storage::write_json_atomic;
use std::path::PathBuf;

#[derive(Debug)]
pub struct InterviewOutcome {
    pub questions: Vec<InterviewQuestion>,
    /// Canonical JSON file the host's interview tool consumes.
    pub path: PathBuf,
}

impl<C: Clock> Orchestrator<C> {
    pub async fn interview(&self) -> Result<InterviewOutcome, OrchestratorError> {
        self.refuse_crew_child()?;
        self.require_agent(ANALYST_AGENT, OrchestratorError::NoAnalyst)?;

        // Prefer the refined plan; fall back to the raw PRD.
        let subject = match self.store().plan_md() {
            Some(plan) => plan,
            None => discover_prd(self.store().cwd(), None)?.content,
        };

        let prompt = format!(
            "Generate clarifying questions a stakeholder should answer before implementation. \
             Emit `### Q<N> (<type>)` blocks where type is one of single, multi, text; the first \
             line is the question, bullets are the options.\n\n# Document\n\n{subject}"
        );
        let run_id = RunId::new();
        let artifacts = self.artifacts_for(&run_id);
        let request =
            self.request(ANALYST_AGENT, 0, AgentRole::Interviewer, prompt, None, &artifacts);
        let run = self
            .run_single(request)
            .await
            .map_err(|err| OrchestratorError::AnalystFailed(err.to_string()))?;

        let questions = parse_interview(&run.output);
        if questions.is_empty() {
            return Err(OrchestratorError::AnalystFailed(
                "analyst output carried no questions".into(),
            ));
        }

        let path = self.store().paths().interview_questions();
        write_json_atomic(&path, &serde_json::json!({ "questions": questions }))
            .map_err(crate::crew_store::CrewError::from)?;
        Ok(InterviewOutcome { questions, path })
    }
}
