// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-time reservation enforcement.
//!
//! Reservations are advisory: they block nothing on their own. The local
//! process checks its own write-class tool calls against every active
//! peer's reservations and aborts on the first match. Reads are never
//! checked.

use crate::registry::RegistryStore;
use pim_core::{normalize_path, Clock, PeerSummary, Reservation};
use serde::Serialize;
use std::path::Path;

/// A blocked write: who holds the covering reservation, and why.
#[derive(Debug, Clone, Serialize)]
pub struct WriteConflict {
    pub peer: PeerSummary,
    pub reservation: Reservation,
    /// The normalized target that matched.
    pub target: String,
}

impl WriteConflict {
    /// Human-readable block message naming the peer and location.
    pub fn message(&self) -> String {
        let location = match &self.peer.branch {
            Some(branch) => format!("{} on {branch}", self.peer.cwd.display()),
            None => self.peer.cwd.display().to_string(),
        };
        let reason = self
            .reservation
            .reason
            .as_deref()
            .map(|r| format!(": {r}"))
            .unwrap_or_default();
        format!(
            "{} is blocked: {} ({location}) reserved {}{reason}",
            self.target, self.peer.name, self.reservation.path
        )
    }
}

/// Check a write-class tool call against active peers' reservations.
///
/// `target` is resolved against `anchor` (the local cwd). First match
/// wins; there is no fairness queue.
pub fn check_write_conflict<C: Clock>(
    registry: &RegistryStore<C>,
    self_name: &str,
    scope: Option<&Path>,
    target: &str,
    anchor: &Path,
) -> Option<WriteConflict> {
    let normalized = normalize_path(target, anchor);
    for peer in registry.active_agents(Some(self_name), scope) {
        if let Some(reservation) = peer.reservation_covering(&normalized) {
            return Some(WriteConflict {
                peer: PeerSummary::from(&peer),
                reservation: reservation.clone(),
                target: normalized,
            });
        }
    }
    None
}

#[cfg(test)]
#[path = "reserve_tests.rs"]
mod tests;
