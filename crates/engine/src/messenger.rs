// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host-integration shell: one long-lived object owning the registry
//! handle, the inbox watcher, the listing cache, first-contact state, and
//! the autonomous-mode state. Handlers take `&self`; nothing here is a
//! process-global.

use crate::actions::Orchestrator;
use crate::autonomous::AutonomousState;
use crate::git;
use crate::spawner::Spawner;
use parking_lot::Mutex;
use pim_core::{
    derive_status, generate_name, validate_name, Claim, Clock, FeedEvent, FeedKind, InboxMessage,
    PeerSummary, PresenceStatus, Registration, Reservation, ReservationSpec,
};
use pim_storage::{
    check_write_conflict, pid_alive, CrewConfig, FeedLog, MessengerConfig, MessengerPaths,
    RegistryError, RegistryStore, SwarmStore, WriteConflict, ENV_AGENT_NAME,
};
use pim_transport::{FirstContactCues, InboxWatcher, MessageHandler};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Debounce for per-file edit events in the activity feed.
const EDIT_FEED_DEBOUNCE_MS: u64 = 5_000;

/// Hooks into the embedding host runtime.
pub trait HostEvents: Send + Sync {
    /// Inject text into the host's turn loop as a new user-visible input.
    fn steer(&self, text: String);
    /// Surface a UI notification.
    fn notify(&self, title: &str, body: &str);
}

/// Default no-op host.
pub struct NullHostEvents;

impl HostEvents for NullHostEvents {
    fn steer(&self, _text: String) {}
    fn notify(&self, _title: &str, _body: &str) {}
}

/// Construction parameters provided by the host runtime.
pub struct SessionInfo {
    pub session_id: String,
    pub cwd: PathBuf,
    pub model: String,
    pub human: bool,
}

pub struct Messenger<C: Clock> {
    pub(crate) paths: MessengerPaths,
    pub(crate) config: MessengerConfig,
    pub(crate) clock: C,
    pub(crate) registry: RegistryStore<C>,
    pub(crate) feed: FeedLog,
    pub(crate) spawner: Arc<dyn Spawner>,
    pub(crate) host: Arc<dyn HostEvents>,
    pub(crate) session: SessionInfo,
    pub(crate) name: Mutex<Option<String>>,
    pub(crate) autonomous: Mutex<Option<AutonomousState>>,
    /// Where `autoRegisterPath` / `crew.install` persist config edits.
    pub(crate) config_path: Option<PathBuf>,
    cues: Arc<FirstContactCues>,
    watcher: Mutex<Option<InboxWatcher>>,
    /// name → last-activity timestamp at the start of the current stuck
    /// episode; cleared when the peer leaves `stuck`.
    stuck_episodes: Mutex<HashMap<String, u64>>,
    /// file → epoch ms of the last edit feed event.
    edit_feed: Mutex<HashMap<String, u64>>,
}

impl<C: Clock> Messenger<C> {
    pub fn new(
        paths: MessengerPaths,
        config: MessengerConfig,
        session: SessionInfo,
        spawner: Arc<dyn Spawner>,
        host: Arc<dyn HostEvents>,
        clock: C,
    ) -> Self {
        let registry = RegistryStore::new(paths.clone(), clock.clone());
        let feed = FeedLog::with_default_retention(paths.feed_file());
        Self {
            paths,
            config,
            clock,
            registry,
            feed,
            spawner,
            host,
            session,
            name: Mutex::new(None),
            autonomous: Mutex::new(None),
            config_path: MessengerPaths::global_config(),
            cues: Arc::new(FirstContactCues::new()),
            watcher: Mutex::new(None),
            stuck_episodes: Mutex::new(HashMap::new()),
            edit_feed: Mutex::new(HashMap::new()),
        }
    }

    /// Redirect config persistence (tests, sandboxed hosts).
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    pub fn registry(&self) -> &RegistryStore<C> {
        &self.registry
    }

    pub(crate) fn swarm(&self) -> SwarmStore<'_, C> {
        SwarmStore::new(&self.paths, &self.registry, self.clock.clone())
    }

    pub(crate) fn orchestrator(&self) -> Orchestrator<C> {
        let crew =
            CrewConfig::for_project(&self.project_paths().config_file(), &self.config);
        Orchestrator::new(
            self.session.cwd.clone(),
            Arc::clone(&self.spawner),
            crew,
            self.clock.clone(),
        )
    }

    pub(crate) fn project_paths(&self) -> pim_storage::ProjectPaths {
        pim_storage::ProjectPaths::for_cwd(&self.session.cwd)
    }

    pub(crate) fn scope(&self) -> Option<&std::path::Path> {
        if self.config.scope_to_folder {
            Some(self.session.cwd.as_path())
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Join / leave
    // ------------------------------------------------------------------

    /// Register in the mesh. An explicit name (parameter or env) is never
    /// retried on collision; generated names get numeric suffixes.
    pub fn join(&self, explicit: Option<&str>) -> Result<Registration, RegistryError> {
        let env_name = std::env::var(ENV_AGENT_NAME).ok().filter(|n| !n.is_empty());
        let explicit = explicit.map(str::to_string).or(env_name);

        let name = match explicit {
            Some(name) => {
                validate_name(&name)?;
                name
            }
            None => generate_name(self.config.name_theme, &self.config.name_words, |cand| {
                self.registry
                    .load(cand)
                    .is_some_and(|existing| pid_alive(existing.pid))
            })?,
        };

        let registration = Registration {
            name: name.clone(),
            pid: std::process::id(),
            session_id: self.session.session_id.clone(),
            cwd: self.session.cwd.clone(),
            model: self.session.model.clone(),
            started_at: self.clock.epoch_ms(),
            branch: git::current_branch(&self.session.cwd),
            human: self.session.human,
            activity: pim_core::ActivityRecord {
                last_activity_at: self.clock.epoch_ms(),
                ..Default::default()
            },
            ..Default::default()
        };
        self.registry.register(&registration)?;
        *self.name.lock() = Some(name.clone());

        self.emit_feed(FeedKind::Join);
        self.start_watcher();
        tracing::info!(%name, "joined the mesh");
        Ok(registration)
    }

    /// Clean shutdown: deregister and delete the inbox.
    pub fn leave(&self) {
        if let Some(name) = self.name() {
            self.emit_feed(FeedKind::Leave);
            if let Some(watcher) = self.watcher.lock().take() {
                watcher.shutdown();
            }
            self.registry.deregister(&name, &self.session.session_id);
            *self.name.lock() = None;
        }
    }

    fn start_watcher(&self) {
        let handler = Arc::new(Deliverer {
            registry: RegistryStore::new(self.paths.clone(), self.clock.clone()),
            cues: Arc::clone(&self.cues),
            config: self.config.clone(),
            host: Arc::clone(&self.host),
            seen: Mutex::new(SeenIds::default()),
        });
        let inbox = self.paths.inbox_dir(&self.session.session_id);
        let deadletter = self.paths.deadletter_dir(&self.session.session_id);
        match InboxWatcher::start(inbox, deadletter, handler) {
            Ok(watcher) => *self.watcher.lock() = Some(watcher),
            Err(err) => tracing::warn!(%err, "failed to start inbox watcher"),
        }
    }

    /// Synchronously drain pending messages (used before rename).
    pub fn drain_inbox(&self) {
        if let Some(watcher) = self.watcher.lock().as_ref() {
            watcher.drain_now();
        }
    }

    // ------------------------------------------------------------------
    // Activity & feed
    // ------------------------------------------------------------------

    pub(crate) fn emit_feed(&self, kind: FeedKind) {
        let Some(name) = self.name() else {
            return;
        };
        let event = FeedEvent::new(self.clock.epoch_ms(), name, kind);
        if let Err(err) = self.feed.append(&event) {
            tracing::warn!(%err, "failed to append feed event");
        }
    }

    fn touch(&self, activity: Option<&str>, tool: Option<&str>) {
        let Some(name) = self.name() else {
            return;
        };
        let now = self.clock.epoch_ms();
        let _ = self.registry.update(&name, |reg| {
            reg.activity.last_activity_at = now;
            if let Some(activity) = activity {
                reg.activity.current_activity = Some(activity.to_string());
            }
            if let Some(tool) = tool {
                reg.activity.last_tool = Some(tool.to_string());
                reg.stats.tool_calls += 1;
            }
        });
    }

    /// Host hook: a tool call happened in this session.
    pub fn note_tool_call(&self, tool: &str) {
        self.touch(None, Some(tool));
    }

    /// Host hook: a file was modified; feeds the activity log with a 5 s
    /// per-file debounce and records it in session stats.
    pub fn note_edit(&self, file: &str) {
        let Some(name) = self.name() else {
            return;
        };
        let now = self.clock.epoch_ms();
        let _ = self.registry.update(&name, |reg| {
            reg.activity.last_activity_at = now;
            reg.stats.push_recent_file(file);
        });

        let emit = {
            let mut edits = self.edit_feed.lock();
            match edits.get(file) {
                Some(last) if now.saturating_sub(*last) < EDIT_FEED_DEBOUNCE_MS => false,
                _ => {
                    edits.insert(file.to_string(), now);
                    true
                }
            }
        };
        if emit {
            self.emit_feed(FeedKind::Edit { file: file.to_string() });
        }
    }

    /// Host hook: a bash tool call looked like a git commit.
    pub fn note_commit(&self, message: &str) {
        self.touch(Some("committing"), None);
        self.emit_feed(FeedKind::Commit { message: message.to_string() });
    }

    /// Host hook: a test command ran; pass/fail inferred from exit code.
    pub fn note_test(&self, command: &str, exit_code: i32) {
        self.touch(Some("running tests"), None);
        self.emit_feed(FeedKind::Test {
            command: command.to_string(),
            passed: exit_code == 0,
        });
    }

    /// Host hook: token usage grew.
    pub fn note_tokens(&self, tokens: u64) {
        if let Some(name) = self.name() {
            let _ = self.registry.update(&name, |reg| reg.stats.tokens = tokens);
        }
    }

    // ------------------------------------------------------------------
    // Write enforcement
    // ------------------------------------------------------------------

    /// Check a write-class tool call against peers' reservations. Read
    /// operations must not call this.
    pub fn check_write(&self, target: &str) -> Option<WriteConflict> {
        let name = self.name()?;
        check_write_conflict(
            &self.registry,
            &name,
            self.scope(),
            target,
            &self.session.cwd,
        )
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    /// Presence for one registration; also drives the once-per-episode
    /// stuck notification.
    pub(crate) fn presence_of(&self, reg: &Registration, claims_held: bool) -> PresenceStatus {
        let engaged = claims_held || !reg.reservations.is_empty();
        let elapsed = self.clock.elapsed_since(reg.activity.last_activity_at);
        let status = derive_status(elapsed, engaged, self.config.stuck_threshold_ms());

        let mut episodes = self.stuck_episodes.lock();
        match status {
            PresenceStatus::Stuck => {
                let episode = reg.activity.last_activity_at;
                let is_new = episodes.get(&reg.name) != Some(&episode);
                if is_new {
                    episodes.insert(reg.name.clone(), episode);
                    drop(episodes);
                    self.host.notify(
                        "agent stuck",
                        &format!("{} has been silent past the stuck threshold", reg.name),
                    );
                    self.emit_stuck_event(&reg.name);
                }
            }
            _ => {
                episodes.remove(&reg.name);
            }
        }
        status
    }

    fn emit_stuck_event(&self, name: &str) {
        let event = FeedEvent::new(self.clock.epoch_ms(), name.to_string(), FeedKind::Stuck);
        if let Err(err) = self.feed.append(&event) {
            tracing::warn!(%err, "failed to append stuck event");
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers for handlers
    // ------------------------------------------------------------------

    pub(crate) fn claimant(&self, name: &str, reason: Option<String>) -> Claim {
        Claim {
            agent: name.to_string(),
            session_id: self.session.session_id.clone(),
            pid: std::process::id(),
            claimed_at: self.clock.epoch_ms(),
            reason,
        }
    }

    pub(crate) fn reservation_from(&self, input: &str, reason: Option<&str>) -> Reservation {
        let spec = ReservationSpec::parse(input, &self.session.cwd);
        Reservation {
            path: spec.path,
            dir: spec.dir,
            reason: reason.map(str::to_string),
            since: self.clock.epoch_ms(),
        }
    }

    /// Absolute spec path used as the swarm grouping key.
    pub(crate) fn spec_key(&self, spec: &str) -> String {
        pim_core::normalize_path(spec, &self.session.cwd)
    }
}

/// Recently delivered message ids, bounded. A file redelivered after a
/// deliver-then-crash restart must not produce a second effect.
#[derive(Default)]
struct SeenIds {
    order: std::collections::VecDeque<String>,
    ids: std::collections::HashSet<String>,
}

const SEEN_IDS_CAP: usize = 1_024;

impl SeenIds {
    /// Returns false for an id that was already delivered.
    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > SEEN_IDS_CAP {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
        true
    }
}

/// Inbox delivery: render cues, then hand the text to the host turn loop
/// as a steer event. Idempotent on message id.
struct Deliverer<C: Clock> {
    registry: RegistryStore<C>,
    cues: Arc<FirstContactCues>,
    config: MessengerConfig,
    host: Arc<dyn HostEvents>,
    seen: Mutex<SeenIds>,
}

impl<C: Clock> MessageHandler for Deliverer<C> {
    fn deliver(&self, message: InboxMessage) {
        if !self.seen.lock().insert(&message.id) {
            tracing::debug!(id = %message.id, "skipping duplicate delivery");
            return;
        }
        let sender = self.registry.load(&message.from);
        let summary = sender.as_ref().map(PeerSummary::from);
        let session = sender.as_ref().map(|reg| reg.session_id.as_str());
        let rendered = self.cues.render(&self.config, &message, summary.as_ref(), session);
        self.host.steer(format!("[message from {}] {rendered}", message.from));
    }
}

#[cfg(test)]
#[path = "messenger_tests.rs"]
mod tests;
