// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration and reservation records.
//!
//! A registration file is authoritative only while its PID is alive.
//! Readers that find a dead PID delete the file; the struct itself has no
//! liveness logic (that lives in `pim-storage`).

use crate::pathspec::ReservationSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cap on the recent-modified-files list carried in session stats.
pub const MAX_RECENT_FILES: usize = 20;

/// A declared exclusive-write claim over a file or directory subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Absolute normalized path.
    pub path: String,
    /// Directory reservations cover the whole subtree.
    #[serde(default)]
    pub dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Epoch milliseconds when the reservation was taken.
    pub since: u64,
}

impl Reservation {
    /// Whether `target` (already normalized) is covered by this reservation.
    pub fn covers(&self, target: &str) -> bool {
        ReservationSpec { path: self.path.clone(), dir: self.dir }.matches(target)
    }
}

/// Per-session counters surfaced in listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub tool_calls: u64,
    #[serde(default)]
    pub tokens: u64,
    /// Most recently modified files, newest last, bounded to
    /// [`MAX_RECENT_FILES`].
    #[serde(default)]
    pub recent_files: Vec<String>,
}

impl SessionStats {
    /// Record a modified file, deduplicating and keeping the list bounded.
    pub fn push_recent_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.recent_files.retain(|p| *p != path);
        self.recent_files.push(path);
        if self.recent_files.len() > MAX_RECENT_FILES {
            let excess = self.recent_files.len() - MAX_RECENT_FILES;
            self.recent_files.drain(..excess);
        }
    }
}

/// Last-seen activity for presence derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Epoch milliseconds of the last local event.
    #[serde(default)]
    pub last_activity_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
}

/// One agent's registration file (`registry/<name>.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub pid: u32,
    /// Stable per-process session identifier; inbox directories are keyed
    /// by this, never by name, so renames keep messages flowing.
    pub session_id: String,
    pub cwd: PathBuf,
    pub model: String,
    /// Epoch milliseconds when the process joined the mesh.
    pub started_at: u64,
    /// Branch name, or `@<short-sha>` for a detached head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_path: Option<String>,
    #[serde(default)]
    pub human: bool,
    #[serde(default)]
    pub stats: SessionStats,
    #[serde(default)]
    pub activity: ActivityRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

impl Registration {
    /// First reservation covering `target`, if any.
    pub fn reservation_covering(&self, target: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.covers(target))
    }
}

/// Small peer card used in conflict results and listings, resolved at
/// lookup time rather than back-referencing the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub name: String,
    pub cwd: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub model: String,
}

impl From<&Registration> for PeerSummary {
    fn from(reg: &Registration) -> Self {
        Self {
            name: reg.name.clone(),
            cwd: reg.cwd.clone(),
            branch: reg.branch.clone(),
            model: reg.model.clone(),
        }
    }
}

crate::builder! {
    pub struct RegistrationBuilder => Registration {
        into {
            name: String = "TestAgent",
            session_id: String = "sess-1",
            cwd: PathBuf = "/tmp/project",
            model: String = "test-model",
        }
        set {
            pid: u32 = 1,
            started_at: u64 = 1_000,
        }
        option {
            branch: String = None,
            status_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
