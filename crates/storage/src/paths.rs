// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage layout resolution.
//!
//! ```text
//! <base>/registry/<name>.json
//! <base>/inbox/<session-id>/<ts>-<rand>.json
//! <base>/claims.json
//! <base>/completions.json
//! <base>/swarm.lock
//! <base>/feed.jsonl
//! <project>/.pi/messenger/crew/...
//! ```

use std::path::{Path, PathBuf};

/// Overrides the mesh base directory (default `~/.pi/agent/messenger`).
pub const ENV_BASE_DIR: &str = "PI_MESSENGER_DIR";

/// Explicit agent name; disables retry on collision.
pub const ENV_AGENT_NAME: &str = "PI_MESSENGER_NAME";

/// Set on spawned crew children to block recursive orchestration.
pub const ENV_CREW_CHILD: &str = "PI_MESSENGER_CREW_CHILD";

/// Shared mesh directory layout.
#[derive(Debug, Clone)]
pub struct MessengerPaths {
    base: PathBuf,
}

impl MessengerPaths {
    /// Resolve from the environment override or the home default.
    pub fn resolve() -> Self {
        let base = std::env::var_os(ENV_BASE_DIR)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".pi").join("agent").join("messenger")))
            .unwrap_or_else(|| PathBuf::from(".pi-messenger"));
        Self { base }
    }

    pub fn at(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.base.join("registry")
    }

    pub fn registration_file(&self, name: &str) -> PathBuf {
        self.registry_dir().join(format!("{name}.json"))
    }

    /// Inbox directories are keyed by session id, never by name, so a
    /// rename keeps messages flowing.
    pub fn inbox_dir(&self, session_id: &str) -> PathBuf {
        self.base.join("inbox").join(session_id)
    }

    pub fn deadletter_dir(&self, session_id: &str) -> PathBuf {
        self.inbox_dir(session_id).join(".deadletter")
    }

    pub fn claims_file(&self) -> PathBuf {
        self.base.join("claims.json")
    }

    pub fn completions_file(&self) -> PathBuf {
        self.base.join("completions.json")
    }

    pub fn swarm_lock(&self) -> PathBuf {
        self.base.join("swarm.lock")
    }

    pub fn feed_file(&self) -> PathBuf {
        self.base.join("feed.jsonl")
    }

    /// Global messenger configuration (`~/.pi/agent/pi-messenger.json`).
    pub fn global_config() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pi").join("agent").join("pi-messenger.json"))
    }
}

/// Per-project crew directory layout (`<cwd>/.pi/messenger/crew`).
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    crew: PathBuf,
}

impl ProjectPaths {
    pub fn for_cwd(cwd: &Path) -> Self {
        Self { crew: cwd.join(".pi").join("messenger").join("crew") }
    }

    pub fn crew_dir(&self) -> &Path {
        &self.crew
    }

    pub fn plan_json(&self) -> PathBuf {
        self.crew.join("plan.json")
    }

    pub fn plan_md(&self) -> PathBuf {
        self.crew.join("plan.md")
    }

    pub fn plan_lock(&self) -> PathBuf {
        self.crew.join("plan.lock")
    }

    pub fn planning_progress(&self) -> PathBuf {
        self.crew.join("planning-progress.md")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.crew.join("tasks")
    }

    pub fn task_json(&self, id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{id}.json"))
    }

    pub fn task_md(&self, id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{id}.md"))
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.crew.join("blocks")
    }

    pub fn block_md(&self, id: &str) -> PathBuf {
        self.blocks_dir().join(format!("{id}.md"))
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.crew.join("artifacts")
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.artifacts_dir().join(run_id)
    }

    pub fn interview_questions(&self) -> PathBuf {
        self.crew.join("interview-questions.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.crew.join("config.json")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
