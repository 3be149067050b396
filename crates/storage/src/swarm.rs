// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Swarm claim/complete protocol over shared JSON files.
//!
//! All mutations run under the swarm lock. Stale claims (dead PID,
//! missing registration, or session mismatch) are collected on every
//! entry to the critical section, including read paths, so a crashed
//! claimant never wedges a task.

use crate::fsio::{read_json, write_json_atomic, StoreError};
use crate::lock::{DirLock, LockError, SWARM_LOCK_OPTIONS};
use crate::paths::MessengerPaths;
use crate::proc::pid_alive;
use crate::registry::RegistryStore;
use pim_core::{agent_claim, Claim, ClaimMap, Clock, Completion, CompletionMap};

#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("agent already holds a claim on {spec} / {task_id}")]
    AlreadyHaveClaim { spec: String, task_id: String },
    #[error("task {task_id} already claimed by {}", claim.agent)]
    AlreadyClaimed { task_id: String, claim: Claim },
    #[error("task {task_id} already completed by {}", completion.completed_by)]
    AlreadyCompleted { task_id: String, completion: Completion },
    #[error("task {task_id} is not claimed")]
    NotClaimed { task_id: String },
    #[error("task {task_id} is claimed by {holder}, not you")]
    NotYourClaim { task_id: String, holder: String },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stale-filtered snapshot returned by [`SwarmStore::view`].
#[derive(Debug, Clone, Default)]
pub struct SwarmView {
    pub claims: ClaimMap,
    pub completions: CompletionMap,
}

/// Claims/completions accessor bound to one base directory.
pub struct SwarmStore<'a, C: Clock> {
    paths: &'a MessengerPaths,
    registry: &'a RegistryStore<C>,
    clock: C,
}

impl<'a, C: Clock> SwarmStore<'a, C> {
    pub fn new(paths: &'a MessengerPaths, registry: &'a RegistryStore<C>, clock: C) -> Self {
        Self { paths, registry, clock }
    }

    /// Claim (spec, task) for `claimant`.
    ///
    /// Enforced under the lock: the claimant holds no other claim
    /// anywhere, and the slot has no live claim and no completion.
    pub fn claim(
        &self,
        spec: &str,
        task_id: &str,
        claimant: &Claim,
    ) -> Result<(), SwarmError> {
        let _lock = self.lock()?;
        let mut claims = self.collect_stale(self.load_claims());
        let completions = self.load_completions();

        if let Some(done) = completions.get(spec).and_then(|t| t.get(task_id)) {
            return Err(SwarmError::AlreadyCompleted {
                task_id: task_id.to_string(),
                completion: done.clone(),
            });
        }
        if let Some((held_spec, held_task, _)) = agent_claim(&claims, &claimant.agent) {
            return Err(SwarmError::AlreadyHaveClaim {
                spec: held_spec.to_string(),
                task_id: held_task.to_string(),
            });
        }
        if let Some(existing) = claims.get(spec).and_then(|t| t.get(task_id)) {
            return Err(SwarmError::AlreadyClaimed {
                task_id: task_id.to_string(),
                claim: existing.clone(),
            });
        }

        claims
            .entry(spec.to_string())
            .or_default()
            .insert(task_id.to_string(), claimant.clone());
        self.save_claims(&claims)?;
        tracing::info!(agent = %claimant.agent, %spec, %task_id, "claimed task");
        Ok(())
    }

    /// Release a claim held by `agent`.
    pub fn unclaim(&self, spec: &str, task_id: &str, agent: &str) -> Result<(), SwarmError> {
        let _lock = self.lock()?;
        let mut claims = self.collect_stale(self.load_claims());
        let holder = claims.get(spec).and_then(|t| t.get(task_id));
        match holder {
            None => return Err(SwarmError::NotClaimed { task_id: task_id.to_string() }),
            Some(claim) if claim.agent != agent => {
                return Err(SwarmError::NotYourClaim {
                    task_id: task_id.to_string(),
                    holder: claim.agent.clone(),
                })
            }
            Some(_) => {}
        }
        remove_claim(&mut claims, spec, task_id);
        self.save_claims(&claims)?;
        Ok(())
    }

    /// Move (spec, task) from claims to completions.
    ///
    /// Write ordering is completions first, claims second: a crash in
    /// between leaves the durable outcome recorded and a dangling claim
    /// that the next stale collection removes.
    pub fn complete(
        &self,
        spec: &str,
        task_id: &str,
        agent: &str,
        notes: Option<String>,
    ) -> Result<Completion, SwarmError> {
        let _lock = self.lock()?;
        let mut claims = self.collect_stale(self.load_claims());
        let mut completions = self.load_completions();

        if let Some(done) = completions.get(spec).and_then(|t| t.get(task_id)) {
            return Err(SwarmError::AlreadyCompleted {
                task_id: task_id.to_string(),
                completion: done.clone(),
            });
        }
        match claims.get(spec).and_then(|t| t.get(task_id)) {
            None => return Err(SwarmError::NotClaimed { task_id: task_id.to_string() }),
            Some(claim) if claim.agent != agent => {
                return Err(SwarmError::NotYourClaim {
                    task_id: task_id.to_string(),
                    holder: claim.agent.clone(),
                })
            }
            Some(_) => {}
        }

        let completion = Completion {
            completed_by: agent.to_string(),
            completed_at: self.clock.epoch_ms(),
            notes,
        };
        completions
            .entry(spec.to_string())
            .or_default()
            .insert(task_id.to_string(), completion.clone());
        write_json_atomic(&self.paths.completions_file(), &completions)?;
        remove_claim(&mut claims, spec, task_id);
        self.save_claims(&claims)?;
        tracing::info!(%agent, %spec, %task_id, "completed task");
        Ok(completion)
    }

    /// Stale-filtered snapshot of claims and completions. Runs the same
    /// collection as mutations so even read paths clean up after crashes.
    pub fn view(&self) -> Result<SwarmView, SwarmError> {
        let _lock = self.lock()?;
        let before = self.load_claims();
        let claims = self.collect_stale(before.clone());
        if claims != before {
            self.save_claims(&claims)?;
        }
        Ok(SwarmView { claims, completions: self.load_completions() })
    }

    fn lock(&self) -> Result<DirLock, LockError> {
        DirLock::acquire(&self.paths.swarm_lock(), SWARM_LOCK_OPTIONS)
    }

    fn load_claims(&self) -> ClaimMap {
        read_json(&self.paths.claims_file()).unwrap_or_default()
    }

    fn load_completions(&self) -> CompletionMap {
        read_json(&self.paths.completions_file()).unwrap_or_default()
    }

    fn save_claims(&self, claims: &ClaimMap) -> Result<(), StoreError> {
        write_json_atomic(&self.paths.claims_file(), claims)
    }

    /// Remove claims whose owner is gone: dead PID, no registration, or a
    /// registration with a different session id (the name was recycled).
    fn collect_stale(&self, mut claims: ClaimMap) -> ClaimMap {
        for tasks in claims.values_mut() {
            tasks.retain(|task_id, claim| {
                let live = pid_alive(claim.pid)
                    && self
                        .registry
                        .load(&claim.agent)
                        .is_some_and(|reg| reg.session_id == claim.session_id);
                if !live {
                    tracing::debug!(agent = %claim.agent, %task_id, "collecting stale claim");
                }
                live
            });
        }
        claims.retain(|_, tasks| !tasks.is_empty());
        claims
    }
}

fn remove_claim(claims: &mut ClaimMap, spec: &str, task_id: &str) {
    if let Some(tasks) = claims.get_mut(spec) {
        tasks.remove(task_id);
        if tasks.is_empty() {
            claims.remove(spec);
        }
    }
}

#[cfg(test)]
#[path = "swarm_tests.rs"]
mod tests;
