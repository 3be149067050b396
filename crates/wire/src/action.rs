// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action parsing.
//!
//! The tool accepts an action-based form (`action: "task.done"`) and a
//! legacy key-based form (top-level `claim`, `to`, `reserve`, ...). The
//! action string splits at the first `.` into group and sub-operation.

use serde::{Deserialize, Deserializer, Serialize};

/// Parsed action routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Join,
    Status,
    List,
    Whois,
    Feed,
    SetStatus,
    Reserve,
    Release,
    Rename,
    Send,
    Broadcast,
    Swarm,
    Claim,
    Unclaim,
    Complete,
    Spec,
    AutoRegisterPath,
    TaskCreate,
    TaskShow,
    TaskList,
    TaskStart,
    TaskDone,
    TaskBlock,
    TaskUnblock,
    TaskReady,
    TaskReset,
    Plan,
    Work,
    Review,
    Interview,
    Sync,
    CrewStatus,
    CrewAgents,
    CrewInstall,
    CrewUninstall,
    CrewValidate,
}

impl Action {
    /// Parse an action string; `None` for unknown actions.
    pub fn parse(action: &str) -> Option<Self> {
        let (group, op) = match action.split_once('.') {
            Some((group, op)) => (group, Some(op)),
            None => (action, None),
        };
        match (group, op) {
            ("join", None) => Some(Self::Join),
            ("status", None) => Some(Self::Status),
            ("list", None) => Some(Self::List),
            ("whois", None) => Some(Self::Whois),
            ("feed", None) => Some(Self::Feed),
            ("set_status", None) => Some(Self::SetStatus),
            ("reserve", None) => Some(Self::Reserve),
            ("release", None) => Some(Self::Release),
            ("rename", None) => Some(Self::Rename),
            ("send", None) => Some(Self::Send),
            ("broadcast", None) => Some(Self::Broadcast),
            ("swarm", None) => Some(Self::Swarm),
            ("claim", None) => Some(Self::Claim),
            ("unclaim", None) => Some(Self::Unclaim),
            ("complete", None) => Some(Self::Complete),
            ("spec", None) => Some(Self::Spec),
            ("autoRegisterPath", None) => Some(Self::AutoRegisterPath),
            ("task", Some("create")) => Some(Self::TaskCreate),
            ("task", Some("show")) => Some(Self::TaskShow),
            ("task", Some("list")) => Some(Self::TaskList),
            ("task", Some("start")) => Some(Self::TaskStart),
            ("task", Some("done")) => Some(Self::TaskDone),
            ("task", Some("block")) => Some(Self::TaskBlock),
            ("task", Some("unblock")) => Some(Self::TaskUnblock),
            ("task", Some("ready")) => Some(Self::TaskReady),
            ("task", Some("reset")) => Some(Self::TaskReset),
            ("plan", None) => Some(Self::Plan),
            ("work", None) => Some(Self::Work),
            ("review", None) => Some(Self::Review),
            ("interview", None) => Some(Self::Interview),
            ("sync", None) => Some(Self::Sync),
            ("crew", Some("status")) => Some(Self::CrewStatus),
            ("crew", Some("agents")) => Some(Self::CrewAgents),
            ("crew", Some("install")) => Some(Self::CrewInstall),
            ("crew", Some("uninstall")) => Some(Self::CrewUninstall),
            ("crew", Some("validate")) => Some(Self::CrewValidate),
            _ => None,
        }
    }

    /// Operations allowed before `join`.
    pub fn allowed_unregistered(self) -> bool {
        matches!(self, Self::Join | Self::AutoRegisterPath)
    }
}

/// One string or a list of strings; always a list in memory.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::One(s)) => vec![s],
        Some(Raw::Many(v)) => v,
    })
}

/// The tool's raw parameter object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionInput {
    pub action: Option<String>,
    /// Explicit or target agent name (join, whois, rename).
    pub name: Option<String>,
    pub new_name: Option<String>,
    /// Recipients; accepts a single string or a list.
    #[serde(deserialize_with = "string_or_list")]
    pub to: Vec<String>,
    pub message: Option<String>,
    pub reply_to: Option<String>,
    /// Paths to reserve; accepts a single string or a list.
    #[serde(deserialize_with = "string_or_list")]
    pub reserve: Vec<String>,
    /// Paths to release; accepts a single string or a list.
    #[serde(deserialize_with = "string_or_list")]
    pub release: Vec<String>,
    /// Release everything (replaces the legacy `release: true` sentinel).
    pub release_all: bool,
    pub reason: Option<String>,
    /// Spec path for swarm operations and `spec`.
    pub spec: Option<String>,
    pub task_id: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub depends_on: Vec<String>,
    pub target: Option<String>,
    pub prd: Option<String>,
    pub autonomous: bool,
    pub summary: Option<String>,
    /// Completion evidence.
    #[serde(deserialize_with = "string_or_list")]
    pub commits: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub tests: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub prs: Vec<String>,
    pub cascade: bool,
    pub limit: Option<usize>,
    pub path: Option<String>,
}

impl ActionInput {
    /// Resolve the action: the explicit string wins, else the legacy
    /// key-based form is inferred from which keys are present.
    pub fn resolve(&self) -> Option<Action> {
        if let Some(action) = &self.action {
            return Action::parse(action);
        }
        if !self.to.is_empty() && self.message.is_some() {
            return Some(Action::Send);
        }
        if self.message.is_some() && self.to.is_empty() {
            return Some(Action::Broadcast);
        }
        if !self.reserve.is_empty() {
            return Some(Action::Reserve);
        }
        if !self.release.is_empty() || self.release_all {
            return Some(Action::Release);
        }
        if self.task_id.is_some() && self.spec.is_some() {
            return Some(Action::Claim);
        }
        None
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
