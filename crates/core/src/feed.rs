// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity feed events.
//!
//! The feed is an append-only JSONL log with bounded retention. Kinds are
//! a closed enum: an unknown kind fails deserialization and the lenient
//! reader skips the line, so the formatter can be exhaustive instead of
//! emitting empty strings for junk.

use serde::{Deserialize, Serialize};

/// Default feed retention, in entries.
pub const DEFAULT_FEED_RETENTION: usize = 500;

/// One line of `feed.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Epoch milliseconds.
    pub at: u64,
    /// Acting agent name.
    pub agent: String,
    #[serde(flatten)]
    pub kind: FeedKind,
}

/// Typed feed event kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedKind {
    Join,
    Leave,
    Message { to: String },
    Edit { file: String },
    Commit { message: String },
    Test { command: String, passed: bool },
    Reserve { path: String },
    Release { path: String },
    Stuck,
}

impl FeedEvent {
    pub fn new(at: u64, agent: impl Into<String>, kind: FeedKind) -> Self {
        Self { at, agent: agent.into(), kind }
    }

    /// One human-readable line, used by the `feed` action.
    pub fn format_line(&self) -> String {
        let agent = &self.agent;
        match &self.kind {
            FeedKind::Join => format!("{agent} joined the mesh"),
            FeedKind::Leave => format!("{agent} left the mesh"),
            FeedKind::Message { to } => format!("{agent} messaged {to}"),
            FeedKind::Edit { file } => format!("{agent} edited {file}"),
            FeedKind::Commit { message } => format!("{agent} committed: {message}"),
            FeedKind::Test { command, passed } => {
                let outcome = if *passed { "passed" } else { "failed" };
                format!("{agent} ran tests ({command}): {outcome}")
            }
            FeedKind::Reserve { path } => format!("{agent} reserved {path}"),
            FeedKind::Release { path } => format!("{agent} released {path}"),
            FeedKind::Stuck => format!("{agent} appears stuck"),
        }
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
