// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared spec-test harness.

use parking_lot::Mutex;
use pim_core::SystemClock;
use pim_engine::{FakeSpawner, HostEvents, Messenger, SessionInfo, Spawner};
use pim_storage::{MessengerConfig, MessengerPaths};
use pim_wire::{ActionInput, ActionResponse};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Host stub recording steers and notifications.
pub struct RecordingHost {
    pub steers: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self { steers: Mutex::new(Vec::new()), notifications: Mutex::new(Vec::new()) }
    }
}

impl HostEvents for RecordingHost {
    fn steer(&self, text: String) {
        self.steers.lock().push(text);
    }
    fn notify(&self, title: &str, body: &str) {
        self.notifications.lock().push(format!("{title}: {body}"));
    }
}

/// One shared mesh (base dir + project dir) hosting several agents.
pub struct Mesh {
    pub base: TempDir,
    pub project: TempDir,
    pub host: Arc<RecordingHost>,
    pub spawner: Arc<FakeSpawner>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_agents(&["scout", "planner", "worker", "reviewer", "analyst"])
    }

    pub fn with_agents(agents: &[&str]) -> Self {
        Self {
            base: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
            host: Arc::new(RecordingHost::new()),
            spawner: Arc::new(FakeSpawner::with_agents(agents)),
        }
    }

    /// Spin up an agent process analogue on this mesh.
    pub fn agent(&self, session_id: &str) -> Messenger<SystemClock> {
        let session = SessionInfo {
            session_id: session_id.to_string(),
            cwd: self.project.path().to_path_buf(),
            model: "pi-test".to_string(),
            human: false,
        };
        Messenger::new(
            MessengerPaths::at(self.base.path()),
            MessengerConfig::default(),
            session,
            Arc::clone(&self.spawner) as Arc<dyn Spawner>,
            Arc::clone(&self.host) as Arc<dyn HostEvents>,
            SystemClock,
        )
        .with_config_path(self.base.path().join("pi-messenger.json"))
    }

    pub fn write_prd(&self, content: &str) {
        std::fs::write(self.project.path().join("PRD.md"), content).unwrap();
    }
}

/// Build an ActionInput from inline JSON.
pub fn input(value: serde_json::Value) -> ActionInput {
    serde_json::from_value(value).unwrap()
}

/// Handle an action and assert it succeeded.
pub async fn ok(messenger: &Messenger<SystemClock>, value: serde_json::Value) -> ActionResponse {
    let response = messenger.handle(&input(value.clone())).await;
    assert!(!response.is_error(), "action {value} failed: {response:?}");
    response
}

/// Poll `check` until it returns true or the budget lapses.
pub async fn wait_for(max: Duration, mut check: impl FnMut() -> bool) -> bool {
    let mut waited = Duration::ZERO;
    while waited < max {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    check()
}
