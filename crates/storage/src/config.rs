// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messenger configuration.
//!
//! Global file at `~/.pi/agent/pi-messenger.json`; per-project crew
//! overrides at `<project>/.pi/messenger/crew/config.json`. Both load
//! leniently: missing → defaults, malformed → defaults plus a warning.
//! Field names are camelCase on disk for compatibility with the host
//! runtime's config surface.

use crate::fsio::read_json;
use pim_core::{NameTheme, NameWords, presence::DEFAULT_STUCK_THRESHOLD_SECS};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessengerConfig {
    /// Join the mesh at host session start.
    pub auto_register: bool,
    /// Join only in matching cwds; `~` and `*` expansion supported.
    pub auto_register_paths: Vec<String>,
    /// Filter peer visibility to same-cwd agents.
    pub scope_to_folder: bool,
    /// Seconds before an engaged, silent agent is considered stuck.
    pub stuck_threshold: u64,
    pub name_theme: NameTheme,
    pub name_words: NameWords,
    /// Orientation text injected into a first message from the mesh.
    pub registration_context: Option<String>,
    /// How-to-reply hint appended to delivered messages.
    pub reply_hint: Option<String>,
    /// Include sender details on first contact per (name, session).
    pub sender_details_on_first_contact: bool,
    pub crew: CrewConfig,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            auto_register: false,
            auto_register_paths: Vec::new(),
            scope_to_folder: false,
            stuck_threshold: DEFAULT_STUCK_THRESHOLD_SECS,
            name_theme: NameTheme::Default,
            name_words: NameWords::default(),
            registration_context: None,
            reply_hint: None,
            sender_details_on_first_contact: true,
            crew: CrewConfig::default(),
        }
    }
}

impl MessengerConfig {
    /// Load from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match read_json(path) {
            Some(config) => config,
            None => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), "malformed config, using defaults");
                }
                Self::default()
            }
        }
    }

    pub fn stuck_threshold_ms(&self) -> u64 {
        self.stuck_threshold * 1_000
    }

    /// Whether `cwd` matches the auto-register path list. An empty list
    /// with `auto_register` set matches everywhere.
    pub fn auto_register_matches(&self, cwd: &Path) -> bool {
        if !self.auto_register {
            return false;
        }
        if self.auto_register_paths.is_empty() {
            return true;
        }
        let cwd_str = cwd.to_string_lossy();
        self.auto_register_paths.iter().any(|raw| {
            let expanded = expand_home(raw);
            if let Ok(pattern) = glob::Pattern::new(&expanded) {
                if pattern.matches(&cwd_str) {
                    return true;
                }
            }
            // A plain directory entry also covers everything under it.
            cwd_str == expanded || cwd_str.starts_with(&format!("{expanded}/"))
        })
    }
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{rest}", home.to_string_lossy().trim_end_matches('/'));
        }
    }
    path.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrewConfig {
    pub concurrency: ConcurrencyConfig,
    pub work: WorkConfig,
    pub review: ReviewConfig,
    pub planning: PlanningConfig,
    pub artifacts: ArtifactsConfig,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            work: WorkConfig::default(),
            review: ReviewConfig::default(),
            planning: PlanningConfig::default(),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

impl CrewConfig {
    /// Project config wins wholesale when present; otherwise the global
    /// crew section applies.
    pub fn for_project(crew_config_file: &Path, global: &MessengerConfig) -> Self {
        read_json(crew_config_file).unwrap_or_else(|| global.crew.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcurrencyConfig {
    pub scouts: usize,
    pub workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { scouts: 3, workers: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkConfig {
    pub max_attempts_per_task: u32,
    pub max_waves: u32,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self { max_attempts_per_task: 3, max_waves: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewConfig {
    pub enabled: bool,
    pub max_iterations: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { enabled: true, max_iterations: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanningConfig {
    pub max_passes: u32,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self { max_passes: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactsConfig {
    pub enabled: bool,
    pub cleanup_days: u32,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self { enabled: true, cleanup_days: 7 }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
