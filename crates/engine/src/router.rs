// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action routing: the single tool entry point.
//!
//! `join` and `autoRegisterPath` are the only operations allowed before a
//! registration exists; everything else answers `not_registered`. Every
//! handler returns a `{text, details}` pair; semantic failures carry a
//! typed discriminator, never a process fault.

use crate::actions::OrchestratorError;
use crate::crew_store::CrewError;
use crate::messenger::Messenger;
use pim_core::{agent_claim, format_elapsed_ms, Clock, TaskGraphError};
use pim_storage::{write_json_atomic, LockError, RegistryError, SwarmError};
use pim_transport::{send_message, SendError};
use pim_wire::{Action, ActionInput, ActionResponse, ErrorCode};
use serde_json::json;

impl<C: Clock> Messenger<C> {
    /// Route one tool invocation.
    pub async fn handle(&self, input: &ActionInput) -> ActionResponse {
        let Some(action) = input.resolve() else {
            return ActionResponse::error(
                format!("unknown action {:?}", input.action.as_deref().unwrap_or("")),
                ErrorCode::UnknownAction,
            );
        };
        if !action.allowed_unregistered() && self.name().is_none() {
            return ActionResponse::error(
                "not registered; call join first",
                ErrorCode::NotRegistered,
            );
        }

        match action {
            Action::Join => self.act_join(input),
            Action::Status => self.act_status(),
            Action::List => self.act_list(),
            Action::Whois => self.act_whois(input),
            Action::Feed => self.act_feed(input),
            Action::SetStatus => self.act_set_status(input),
            Action::Reserve => self.act_reserve(input),
            Action::Release => self.act_release(input),
            Action::Rename => self.act_rename(input),
            Action::Send => self.act_send(input),
            Action::Broadcast => self.act_broadcast(input),
            Action::Swarm => self.act_swarm(input),
            Action::Claim => self.act_claim(input),
            Action::Unclaim => self.act_unclaim(input),
            Action::Complete => self.act_complete(input),
            Action::Spec => self.act_spec(input),
            Action::AutoRegisterPath => self.act_auto_register_path(input),
            Action::TaskCreate => self.act_task_create(input),
            Action::TaskShow => self.act_task_show(input),
            Action::TaskList => self.act_task_list(),
            Action::TaskStart => self.act_task_start(input),
            Action::TaskDone => self.act_task_done(input),
            Action::TaskBlock => self.act_task_block(input),
            Action::TaskUnblock => self.act_task_unblock(input),
            Action::TaskReady => self.act_task_ready(),
            Action::TaskReset => self.act_task_reset(input),
            Action::Plan => self.act_plan(input).await,
            Action::Work => self.act_work(input).await,
            Action::Review => self.act_review(input).await,
            Action::Interview => self.act_interview().await,
            Action::Sync => self.act_sync(input).await,
            Action::CrewStatus => self.act_crew_status(),
            Action::CrewAgents => self.act_crew_agents(),
            Action::CrewInstall => self.act_crew_install(),
            Action::CrewUninstall => self.act_crew_uninstall(),
            Action::CrewValidate => self.act_crew_validate(),
        }
    }

    // ------------------------------------------------------------------
    // Mesh
    // ------------------------------------------------------------------

    fn act_join(&self, input: &ActionInput) -> ActionResponse {
        if let Some(name) = self.name() {
            return ActionResponse::with(
                format!("already joined as {name}"),
                json!({"name": name}),
            );
        }
        match self.join(input.name.as_deref()) {
            Ok(reg) => ActionResponse::with(
                format!("joined the mesh as {}", reg.name),
                json!({
                    "name": reg.name,
                    "sessionId": reg.session_id,
                    "branch": reg.branch,
                }),
            ),
            Err(err) => registry_error(err),
        }
    }

    fn act_status(&self) -> ActionResponse {
        let Some(name) = self.name() else {
            return ActionResponse::error("not registered", ErrorCode::NotRegistered);
        };
        let Some(reg) = self.registry.load(&name) else {
            return ActionResponse::error(
                "registration missing",
                ErrorCode::InvalidRegistration,
            );
        };
        let view = self.swarm().view().ok();
        let claim = view
            .as_ref()
            .and_then(|v| agent_claim(&v.claims, &name))
            .map(|(spec, task, _)| json!({"spec": spec, "taskId": task}));
        let status = self.presence_of(&reg, claim.is_some());
        let mut text = format!("{name}: {status}");
        if let Some(message) = &reg.status_message {
            text.push_str(&format!(" — {message}"));
        }
        ActionResponse::with(
            text,
            json!({
                "name": name,
                "status": status,
                "statusMessage": reg.status_message,
                "reservations": reg.reservations,
                "claim": claim,
                "specPath": reg.spec_path,
            }),
        )
    }

    fn act_list(&self) -> ActionResponse {
        let name = self.name().unwrap_or_default();
        let peers = self.registry.active_agents(Some(&name), self.scope());
        let view = self.swarm().view().ok().unwrap_or_default();

        let mut lines = Vec::new();
        let mut entries = Vec::new();
        for peer in &peers {
            let claim = agent_claim(&view.claims, &peer.name);
            let status = self.presence_of(peer, claim.is_some());
            let elapsed = self.clock.elapsed_since(peer.activity.last_activity_at);
            lines.push(format!(
                "{} [{}] {} ({}), active {}",
                peer.name,
                status,
                peer.cwd.display(),
                peer.branch.as_deref().unwrap_or("no branch"),
                format_elapsed_ms(elapsed),
            ));
            entries.push(json!({
                "name": peer.name,
                "status": status,
                "cwd": peer.cwd,
                "branch": peer.branch,
                "model": peer.model,
                "statusMessage": peer.status_message,
                "claim": claim.map(|(spec, task, _)| json!({"spec": spec, "taskId": task})),
                "reservations": peer.reservations,
            }));
        }
        let text = if lines.is_empty() {
            "no other agents in the mesh".to_string()
        } else {
            lines.join("\n")
        };
        ActionResponse::with(text, json!({"agents": entries}))
    }

    fn act_whois(&self, input: &ActionInput) -> ActionResponse {
        let Some(target) = input.name.as_deref().or(input.to.first().map(String::as_str))
        else {
            return ActionResponse::error("whois requires a name", ErrorCode::NotFound);
        };
        let Some(reg) = self.registry.load(target) else {
            return ActionResponse::error(
                format!("no agent named {target}"),
                ErrorCode::NotFound,
            );
        };
        if !pim_storage::pid_alive(reg.pid) {
            return ActionResponse::error(
                format!("{target} is registered but its process is gone"),
                ErrorCode::NotActive,
            );
        }
        let view = self.swarm().view().ok().unwrap_or_default();
        let claim = agent_claim(&view.claims, target)
            .map(|(spec, task, c)| json!({"spec": spec, "taskId": task, "since": c.claimed_at}));
        let status = self.presence_of(&reg, claim.is_some());
        ActionResponse::with(
            format!(
                "{target} [{status}] in {} ({}), model {}",
                reg.cwd.display(),
                reg.branch.as_deref().unwrap_or("no branch"),
                reg.model,
            ),
            json!({
                "name": reg.name,
                "status": status,
                "cwd": reg.cwd,
                "branch": reg.branch,
                "model": reg.model,
                "human": reg.human,
                "startedAt": reg.started_at,
                "statusMessage": reg.status_message,
                "specPath": reg.spec_path,
                "stats": reg.stats,
                "reservations": reg.reservations,
                "claim": claim,
            }),
        )
    }

    fn act_feed(&self, input: &ActionInput) -> ActionResponse {
        let limit = input.limit.unwrap_or(20);
        let events = self.feed.recent(limit);
        let lines: Vec<String> = events
            .iter()
            .map(|event| {
                let age = format_elapsed_ms(self.clock.elapsed_since(event.at));
                format!("{} ({age})", event.format_line())
            })
            .collect();
        let text = if lines.is_empty() {
            "feed is empty".to_string()
        } else {
            lines.join("\n")
        };
        ActionResponse::with(text, json!({"events": events}))
    }

    fn act_set_status(&self, input: &ActionInput) -> ActionResponse {
        let name = self.name().unwrap_or_default();
        let message = input
            .status
            .as_deref()
            .or(input.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let cleared = message.is_none();
        match self.registry.update(&name, |reg| reg.status_message = message.clone()) {
            Ok(()) => ActionResponse::with(
                if cleared {
                    "status cleared".to_string()
                } else {
                    format!("status set: {}", message.as_deref().unwrap_or_default())
                },
                json!({"statusMessage": message}),
            ),
            Err(err) => registry_error(err),
        }
    }

    fn act_reserve(&self, input: &ActionInput) -> ActionResponse {
        if input.reserve.is_empty() {
            return ActionResponse::error("reserve requires paths", ErrorCode::NotFound);
        }
        let name = self.name().unwrap_or_default();
        let reservations: Vec<_> = input
            .reserve
            .iter()
            .map(|p| self.reservation_from(p, input.reason.as_deref()))
            .collect();
        let result = self.registry.update(&name, |reg| {
            for reservation in &reservations {
                if !reg.reservations.iter().any(|r| r.path == reservation.path) {
                    reg.reservations.push(reservation.clone());
                }
            }
        });
        if let Err(err) = result {
            return registry_error(err);
        }
        for reservation in &reservations {
            self.emit_feed(pim_core::FeedKind::Reserve { path: reservation.path.clone() });
        }
        ActionResponse::with(
            format!(
                "reserved {}",
                reservations.iter().map(|r| r.path.as_str()).collect::<Vec<_>>().join(", ")
            ),
            json!({"reservations": reservations}),
        )
    }

    fn act_release(&self, input: &ActionInput) -> ActionResponse {
        let name = self.name().unwrap_or_default();
        let targets: Vec<String> = input
            .release
            .iter()
            .map(|p| self.reservation_from(p, None).path)
            .collect();
        let release_all = input.release_all;
        let mut released = Vec::new();
        let result = self.registry.update(&name, |reg| {
            reg.reservations.retain(|r| {
                let drop = release_all || targets.contains(&r.path);
                if drop {
                    released.push(r.path.clone());
                }
                !drop
            });
        });
        if let Err(err) = result {
            return registry_error(err);
        }
        for path in &released {
            self.emit_feed(pim_core::FeedKind::Release { path: path.clone() });
        }
        ActionResponse::with(
            if released.is_empty() {
                "nothing to release".to_string()
            } else {
                format!("released {}", released.join(", "))
            },
            json!({"released": released}),
        )
    }

    fn act_rename(&self, input: &ActionInput) -> ActionResponse {
        let Some(new_name) = input.new_name.as_deref().or(input.name.as_deref()) else {
            return ActionResponse::error("rename requires a new name", ErrorCode::InvalidName);
        };
        let Some(old) = self.name() else {
            return ActionResponse::error("not registered", ErrorCode::NotRegistered);
        };
        // Deliver anything pending under the old name first.
        self.drain_inbox();
        match self.registry.rename(&old, new_name) {
            Ok(reg) => {
                *self.name.lock() = Some(reg.name.clone());
                ActionResponse::with(
                    format!("renamed {old} -> {}", reg.name),
                    json!({"name": reg.name, "previous": old}),
                )
            }
            Err(err) => registry_error(err),
        }
    }

    fn act_send(&self, input: &ActionInput) -> ActionResponse {
        let Some(message) = input.message.as_deref() else {
            return ActionResponse::error("send requires a message", ErrorCode::NotFound);
        };
        if input.to.is_empty() {
            return ActionResponse::error("send requires a recipient", ErrorCode::NotFound);
        }
        let name = self.name().unwrap_or_default();

        let mut sent = Vec::new();
        let mut failures = Vec::new();
        for target in &input.to {
            match send_message(
                &self.registry,
                &self.clock,
                &name,
                target,
                message,
                input.reply_to.clone(),
            ) {
                Ok((msg, _)) => {
                    self.emit_feed(pim_core::FeedKind::Message { to: target.clone() });
                    sent.push(json!({"to": target, "id": msg.id}));
                }
                Err(err) => failures.push(send_failure(target, err)),
            }
        }
        let text = match (sent.len(), failures.len()) {
            (n, 0) => format!("sent to {n} recipient(s)"),
            (0, _) => "send failed".to_string(),
            (n, f) => format!("sent to {n} recipient(s), {f} failed"),
        };
        let mut response =
            ActionResponse::with(text, json!({"sent": sent, "failures": failures}));
        if sent.is_empty() {
            response.details.error = Some(ErrorCode::NotFound);
        }
        response
    }

    fn act_broadcast(&self, input: &ActionInput) -> ActionResponse {
        let Some(message) = input.message.as_deref() else {
            return ActionResponse::error("broadcast requires a message", ErrorCode::NotFound);
        };
        let name = self.name().unwrap_or_default();
        let peers = self.registry.active_agents(Some(&name), self.scope());
        let mut sent = 0;
        let mut failures = Vec::new();
        for peer in &peers {
            match send_message(&self.registry, &self.clock, &name, &peer.name, message, None) {
                Ok(_) => sent += 1,
                Err(err) => failures.push(send_failure(&peer.name, err)),
            }
        }
        if sent > 0 {
            self.emit_feed(pim_core::FeedKind::Message { to: format!("{sent} agents") });
        }
        ActionResponse::with(
            format!("broadcast to {sent} agent(s)"),
            json!({"sent": sent, "failures": failures}),
        )
    }

    // ------------------------------------------------------------------
    // Swarm
    // ------------------------------------------------------------------

    fn act_claim(&self, input: &ActionInput) -> ActionResponse {
        let Some(spec) = input.spec.as_deref() else {
            return ActionResponse::error("claim requires a spec path", ErrorCode::NoSpec);
        };
        let Some(task_id) = input.task_id.as_deref() else {
            return ActionResponse::error("claim requires a task id", ErrorCode::NotClaimed);
        };
        let name = self.name().unwrap_or_default();
        let key = self.spec_key(spec);
        let claim = self.claimant(&name, input.reason.clone());
        match self.swarm().claim(&key, task_id, &claim) {
            Ok(()) => ActionResponse::with(
                format!("claimed {task_id} on {key}"),
                json!({"spec": key, "taskId": task_id}),
            ),
            Err(err) => swarm_error(err),
        }
    }

    fn act_unclaim(&self, input: &ActionInput) -> ActionResponse {
        let (Some(spec), Some(task_id)) = (input.spec.as_deref(), input.task_id.as_deref())
        else {
            return ActionResponse::error(
                "unclaim requires spec and task id",
                ErrorCode::NoSpec,
            );
        };
        let name = self.name().unwrap_or_default();
        let key = self.spec_key(spec);
        match self.swarm().unclaim(&key, task_id, &name) {
            Ok(()) => ActionResponse::with(
                format!("released claim on {task_id}"),
                json!({"spec": key, "taskId": task_id}),
            ),
            Err(err) => swarm_error(err),
        }
    }

    fn act_complete(&self, input: &ActionInput) -> ActionResponse {
        let (Some(spec), Some(task_id)) = (input.spec.as_deref(), input.task_id.as_deref())
        else {
            return ActionResponse::error(
                "complete requires spec and task id",
                ErrorCode::NoSpec,
            );
        };
        let name = self.name().unwrap_or_default();
        let key = self.spec_key(spec);
        match self.swarm().complete(&key, task_id, &name, input.notes.clone()) {
            Ok(completion) => ActionResponse::with(
                format!("completed {task_id} on {key}"),
                json!({"spec": key, "taskId": task_id, "completion": completion}),
            ),
            Err(err) => swarm_error(err),
        }
    }

    fn act_swarm(&self, input: &ActionInput) -> ActionResponse {
        let view = match self.swarm().view() {
            Ok(view) => view,
            Err(err) => return swarm_error(err),
        };
        let filter = input.spec.as_deref().map(|s| self.spec_key(s));
        let mut lines = Vec::new();
        for (spec, tasks) in &view.claims {
            if filter.as_deref().is_some_and(|f| f != spec.as_str()) {
                continue;
            }
            for (task_id, claim) in tasks {
                lines.push(format!("{spec} {task_id}: claimed by {}", claim.agent));
            }
        }
        for (spec, tasks) in &view.completions {
            if filter.as_deref().is_some_and(|f| f != spec.as_str()) {
                continue;
            }
            for (task_id, done) in tasks {
                lines.push(format!("{spec} {task_id}: completed by {}", done.completed_by));
            }
        }
        let text = if lines.is_empty() {
            "no claims or completions".to_string()
        } else {
            lines.join("\n")
        };
        ActionResponse::with(
            text,
            json!({"claims": view.claims, "completions": view.completions}),
        )
    }

    fn act_spec(&self, input: &ActionInput) -> ActionResponse {
        let name = self.name().unwrap_or_default();
        let spec_path = input
            .spec
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| self.spec_key(s));
        let cleared = spec_path.is_none();
        match self.registry.update(&name, |reg| reg.spec_path = spec_path.clone()) {
            Ok(()) => ActionResponse::with(
                if cleared {
                    "spec cleared".to_string()
                } else {
                    format!("spec set to {}", spec_path.as_deref().unwrap_or_default())
                },
                json!({"specPath": spec_path}),
            ),
            Err(err) => registry_error(err),
        }
    }

    fn act_auto_register_path(&self, input: &ActionInput) -> ActionResponse {
        let Some(path) = input.path.as_deref().filter(|p| !p.is_empty()) else {
            return ActionResponse::error(
                "autoRegisterPath requires a path",
                ErrorCode::NotFound,
            );
        };
        self.persist_config(|config| {
            config.auto_register = true;
            if !config.auto_register_paths.iter().any(|p| p == path) {
                config.auto_register_paths.push(path.to_string());
            }
        })
    }

    // ------------------------------------------------------------------
    // Config persistence
    // ------------------------------------------------------------------

    pub(crate) fn persist_config(
        &self,
        mutate: impl FnOnce(&mut pim_storage::MessengerConfig),
    ) -> ActionResponse {
        let Some(path) = self.config_path.as_ref() else {
            return ActionResponse::error("no config location", ErrorCode::Internal);
        };
        let mut config = pim_storage::MessengerConfig::load(path);
        mutate(&mut config);
        match write_json_atomic(path, &config) {
            Ok(()) => ActionResponse::with(
                format!("config updated at {}", path.display()),
                json!({"autoRegister": config.auto_register, "autoRegisterPaths": config.auto_register_paths}),
            ),
            Err(err) => {
                ActionResponse::error(format!("config write failed: {err}"), ErrorCode::Internal)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error mappers
// ---------------------------------------------------------------------------

pub(crate) fn registry_error(err: RegistryError) -> ActionResponse {
    let code = match &err {
        RegistryError::InvalidName(_) => ErrorCode::InvalidName,
        RegistryError::NameTaken(_) => ErrorCode::NameTaken,
        RegistryError::RaceLost { .. } => ErrorCode::RaceLost,
        RegistryError::Vanished(_) | RegistryError::Store(_) => ErrorCode::RegistrationFailed,
    };
    ActionResponse::error(err.to_string(), code)
}

pub(crate) fn send_failure(target: &str, err: SendError) -> serde_json::Value {
    let code = match &err {
        SendError::InvalidName(_) => ErrorCode::InvalidName,
        SendError::NotFound(_) => ErrorCode::NotFound,
        SendError::NotActive(_) => ErrorCode::NotActive,
        SendError::InvalidRegistration(_) => ErrorCode::InvalidRegistration,
        SendError::Store(_) => ErrorCode::Internal,
    };
    json!({"to": target, "error": code, "message": err.to_string()})
}

pub(crate) fn swarm_error(err: SwarmError) -> ActionResponse {
    match err {
        SwarmError::AlreadyHaveClaim { spec, task_id } => ActionResponse::error_with(
            format!("you already hold a claim on {task_id} ({spec})"),
            ErrorCode::AlreadyHaveClaim,
            json!({"spec": spec, "taskId": task_id}),
        ),
        SwarmError::AlreadyClaimed { task_id, claim } => ActionResponse::error_with(
            format!("{task_id} is already claimed by {}", claim.agent),
            ErrorCode::AlreadyClaimed,
            json!({"taskId": task_id, "holder": claim.agent, "since": claim.claimed_at}),
        ),
        SwarmError::AlreadyCompleted { task_id, completion } => ActionResponse::error_with(
            format!("{task_id} was already completed by {}", completion.completed_by),
            ErrorCode::AlreadyCompleted,
            json!({"taskId": task_id, "completedBy": completion.completed_by}),
        ),
        SwarmError::NotClaimed { task_id } => ActionResponse::error_with(
            format!("{task_id} is not claimed"),
            ErrorCode::NotClaimed,
            json!({"taskId": task_id}),
        ),
        SwarmError::NotYourClaim { task_id, holder } => ActionResponse::error_with(
            format!("{task_id} is claimed by {holder}"),
            ErrorCode::NotYourClaim,
            json!({"taskId": task_id, "holder": holder}),
        ),
        SwarmError::Lock(err) => lock_error(err),
        SwarmError::Store(err) => {
            ActionResponse::error(format!("storage fault: {err}"), ErrorCode::Internal)
        }
    }
}

pub(crate) fn lock_error(err: LockError) -> ActionResponse {
    match err {
        LockError::Held { holder, path } => ActionResponse::error_with(
            format!("locked by pid {holder:?} ({})", path.display()),
            ErrorCode::Locked,
            json!({"holder": holder}),
        ),
        other => ActionResponse::error(other.to_string(), ErrorCode::Locked),
    }
}

pub(crate) fn crew_error(err: CrewError) -> ActionResponse {
    match err {
        CrewError::PlanExists { prd_path } => ActionResponse::error_with(
            format!("a plan already exists for {prd_path}"),
            ErrorCode::PlanExists,
            json!({"prdPath": prd_path}),
        ),
        CrewError::NoPlan => ActionResponse::error("no plan in this project", ErrorCode::NoPlan),
        CrewError::NoPrd => ActionResponse::error("no PRD found", ErrorCode::NoPrd),
        CrewError::NotFound(id) => ActionResponse::error_with(
            format!("task {id} not found"),
            ErrorCode::NotFound,
            json!({"taskId": id}),
        ),
        CrewError::InvalidStatus { ref id, actual, expected } => ActionResponse::error_with(
            err.to_string(),
            ErrorCode::InvalidStatus,
            json!({"taskId": id, "actual": actual, "expected": expected}),
        ),
        CrewError::UnmetDependencies { ref id, ref missing } => ActionResponse::error_with(
            err.to_string(),
            ErrorCode::UnmetDependencies,
            json!({"taskId": id, "missing": missing}),
        ),
        CrewError::Graph(TaskGraphError::DependencyNotFound { ref task, ref dep }) => {
            ActionResponse::error_with(
                err.to_string(),
                ErrorCode::DependencyNotFound,
                json!({"task": task, "dep": dep}),
            )
        }
        CrewError::Graph(TaskGraphError::Cycle { ref path }) => ActionResponse::error_with(
            err.to_string(),
            ErrorCode::DependencyCycle,
            json!({"cycle": path}),
        ),
        CrewError::Lock(err) => lock_error(err),
        CrewError::Store(err) => {
            ActionResponse::error(format!("storage fault: {err}"), ErrorCode::Internal)
        }
    }
}

pub(crate) fn orchestrator_error(err: OrchestratorError) -> ActionResponse {
    match err {
        OrchestratorError::NoPlanner => {
            ActionResponse::error("no planner agent is configured", ErrorCode::NoPlanner)
        }
        OrchestratorError::NoWorker => {
            ActionResponse::error("no worker agent is configured", ErrorCode::NoWorker)
        }
        OrchestratorError::NoReviewer => {
            ActionResponse::error("no reviewer agent is configured", ErrorCode::NoReviewer)
        }
        OrchestratorError::NoAnalyst => {
            ActionResponse::error("no analyst agent is configured", ErrorCode::NoAnalyst)
        }
        OrchestratorError::PlannerFailed(message) => ActionResponse::error_with(
            format!("planner failed: {message}"),
            ErrorCode::PlannerFailed,
            json!({"message": message}),
        ),
        OrchestratorError::AnalystFailed(message) => ActionResponse::error_with(
            format!("analyst failed: {message}"),
            ErrorCode::AnalystFailed,
            json!({"message": message}),
        ),
        OrchestratorError::ReviewerFailed(message) => ActionResponse::error_with(
            format!("reviewer failed: {message}"),
            ErrorCode::ReviewerFailed,
            json!({"message": message}),
        ),
        OrchestratorError::AllScoutsFailed => {
            ActionResponse::error("every scout failed", ErrorCode::AllScoutsFailed)
        }
        OrchestratorError::CrewChild => ActionResponse::error(
            "crew actions are not available to crew child processes",
            ErrorCode::CrewChild,
        ),
        OrchestratorError::Crew(err) => crew_error(err),
    }
}

