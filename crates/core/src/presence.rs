// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence status derivation.
//!
//! Status is a pure function of elapsed time since the agent's last local
//! event, whether it is engaged (holds a claim or a reservation), and the
//! configured stuck threshold.

use serde::{Deserialize, Serialize};

/// Under this, an agent is `active`.
pub const ACTIVE_WINDOW_MS: u64 = 30_000;

/// Under this, an agent is `idle` regardless of engagement.
pub const IDLE_WINDOW_MS: u64 = 5 * 60_000;

/// Default stuck threshold (overridable via config), in seconds.
pub const DEFAULT_STUCK_THRESHOLD_SECS: u64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Active,
    Idle,
    Away,
    Stuck,
}

crate::simple_display! {
    PresenceStatus {
        Active => "active",
        Idle => "idle",
        Away => "away",
        Stuck => "stuck",
    }
}

/// Derive presence from elapsed milliseconds since last activity.
///
/// `engaged` means the agent holds a claim or a reservation: an engaged
/// agent that goes quiet is presumed working (idle) until the stuck
/// threshold, while an unengaged one is just away.
pub fn derive_status(elapsed_ms: u64, engaged: bool, stuck_threshold_ms: u64) -> PresenceStatus {
    if elapsed_ms < ACTIVE_WINDOW_MS {
        PresenceStatus::Active
    } else if elapsed_ms < IDLE_WINDOW_MS {
        PresenceStatus::Idle
    } else if elapsed_ms < stuck_threshold_ms {
        if engaged {
            PresenceStatus::Idle
        } else {
            PresenceStatus::Away
        }
    } else if engaged {
        PresenceStatus::Stuck
    } else {
        PresenceStatus::Away
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
