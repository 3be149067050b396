// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim and completion records for the swarm protocol.
//!
//! The maps mirror the on-disk layout of `claims.json` and
//! `completions.json`: absolute spec path → task id → record. `BTreeMap`
//! keeps the serialized files deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An active claim on one (spec, task id) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub agent: String,
    pub session_id: String,
    pub pid: u32,
    /// Epoch milliseconds.
    pub claimed_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A terminal completion of one (spec, task id) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub completed_by: String,
    /// Epoch milliseconds.
    pub completed_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// spec path → task id → claim.
pub type ClaimMap = BTreeMap<String, BTreeMap<String, Claim>>;

/// spec path → task id → completion.
pub type CompletionMap = BTreeMap<String, BTreeMap<String, Completion>>;

/// Find the claim held by `agent`, if any, across all specs.
///
/// Invariant 1 guarantees at most one exists in a consistent file.
pub fn agent_claim<'a>(claims: &'a ClaimMap, agent: &str) -> Option<(&'a str, &'a str, &'a Claim)> {
    claims.iter().find_map(|(spec, tasks)| {
        tasks
            .iter()
            .find(|(_, claim)| claim.agent == agent)
            .map(|(task, claim)| (spec.as_str(), task.as_str(), claim))
    })
}

#[cfg(test)]
#[path = "swarm_tests.rs"]
mod tests;
