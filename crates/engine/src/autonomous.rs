// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomous-mode state machine.
//!
//! Lives in the session (not on disk): the host persists it as a session
//! entry and hands it back on the next turn, which is how the wave loop
//! resumes. `next_wave` is incremented when a wave result is recorded, so
//! at inspection time it names the wave that would run next.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Blocked,
    Manual,
}

pim_core::simple_display! {
    StopReason {
        Completed => "completed",
        Blocked => "blocked",
        Manual => "manual",
    }
}

/// One recorded wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveResult {
    pub wave: u32,
    pub attempted: Vec<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub blocked: Vec<String>,
    /// Epoch milliseconds.
    pub at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousState {
    pub active: bool,
    pub cwd: PathBuf,
    /// Number of the wave that would run next (see module docs).
    pub next_wave: u32,
    /// Attempt counts per task id across the run.
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,
    #[serde(default)]
    pub waves: Vec<WaveResult>,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

impl AutonomousState {
    pub fn start(cwd: PathBuf, now: u64) -> Self {
        Self {
            active: true,
            cwd,
            next_wave: 1,
            attempts: BTreeMap::new(),
            waves: Vec::new(),
            started_at: now,
            stopped_at: None,
            stop_reason: None,
        }
    }

    /// Record a finished wave and advance `next_wave`.
    pub fn record_wave(&mut self, mut result: WaveResult) {
        result.wave = self.next_wave;
        for task in &result.attempted {
            *self.attempts.entry(task.clone()).or_insert(0) += 1;
        }
        self.waves.push(result);
        self.next_wave += 1;
    }

    /// Waves completed so far.
    pub fn completed_waves(&self) -> u32 {
        self.next_wave.saturating_sub(1)
    }

    pub fn stop(&mut self, reason: StopReason, now: u64) {
        self.active = false;
        self.stop_reason = Some(reason);
        self.stopped_at = Some(now);
    }
}

#[cfg(test)]
#[path = "autonomous_tests.rs"]
mod tests;
