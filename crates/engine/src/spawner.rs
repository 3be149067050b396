// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child agent spawning.
//!
//! Children are `pi --mode json --agent <name> -p <prompt>` processes
//! speaking JSONL on stdout. Malformed lines are skipped. The final
//! output is assembled from assistant events and truncated per role
//! budget, with the full output preserved as an artifact when artifacts
//! are enabled. Aborts escalate SIGTERM → SIGKILL after three seconds.

use pim_storage::ENV_CREW_CHILD;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Grace period between SIGTERM and SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(3);

/// Output cap for one agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputBudget {
    pub max_bytes: usize,
    pub max_lines: usize,
}

/// Child roles, distinguished by prompt and output budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Scout,
    Analyst,
    Worker,
    Reviewer,
    Interviewer,
    Syncer,
}

impl AgentRole {
    /// Default output budget for the role.
    pub fn budget(self) -> OutputBudget {
        match self {
            AgentRole::Scout => OutputBudget { max_bytes: 50 * 1024, max_lines: 500 },
            AgentRole::Analyst => OutputBudget { max_bytes: 100 * 1024, max_lines: 2_000 },
            AgentRole::Worker
            | AgentRole::Reviewer
            | AgentRole::Interviewer
            | AgentRole::Syncer => OutputBudget { max_bytes: 200 * 1024, max_lines: 5_000 },
        }
    }
}

/// One spawn order.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Agent definition name passed to `pi --agent`.
    pub agent: String,
    /// Position within the wave; also keys artifact filenames.
    pub idx: usize,
    pub role: AgentRole,
    pub prompt: String,
    pub cwd: PathBuf,
    /// Per-request override of the role budget.
    pub max_output: Option<OutputBudget>,
    /// Where this run's four artifacts land (run-scoped).
    pub artifacts: ArtifactSink,
}

impl SpawnRequest {
    pub fn budget(&self) -> OutputBudget {
        self.max_output.unwrap_or_else(|| self.role.budget())
    }
}

/// Completed run, output already truncated to budget.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub agent: String,
    pub idx: usize,
    pub output: String,
    pub truncated: bool,
    pub tokens: u64,
    pub elapsed_ms: u64,
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to spawn agent {agent}: {source}")]
    Spawn {
        agent: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error reading agent {agent}: {source}")]
    Io {
        agent: String,
        #[source]
        source: std::io::Error,
    },
    #[error("agent {agent} failed with exit code {exit_code:?}: {message}")]
    Failed { agent: String, exit_code: Option<i32>, message: String },
    #[error("agent {agent} aborted")]
    Aborted { agent: String },
}

/// Spawns children and reports which agent definitions exist.
#[async_trait::async_trait]
pub trait Spawner: Send + Sync {
    fn has_agent(&self, agent: &str) -> bool;
    async fn run(&self, request: SpawnRequest) -> Result<AgentRun, SpawnError>;
}

/// Sink for the four per-run artifacts. A `None` directory disables it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSink {
    dir: Option<PathBuf>,
}

impl ArtifactSink {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    fn file(&self, request: &SpawnRequest, suffix: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}-{}.{suffix}", request.agent, request.idx)))
    }

    /// Path the truncation marker should point readers at.
    pub fn output_path(&self, request: &SpawnRequest) -> Option<PathBuf> {
        self.file(request, "output.md")
    }

    fn write(&self, request: &SpawnRequest, suffix: &str, content: &str) {
        let Some(path) = self.file(request, suffix) else {
            return;
        };
        if let Err(err) = pim_storage::write_text_atomic(&path, content) {
            tracing::warn!(path = %path.display(), %err, "failed to write artifact");
        }
    }
}

/// Raw collected stdout before truncation.
#[derive(Debug, Default)]
struct Collected {
    assistant: Vec<String>,
    transcript: Vec<String>,
    tokens: u64,
    errors: Vec<String>,
}

impl Collected {
    /// Parse one JSONL line; malformed lines are skipped.
    fn feed(&mut self, line: &str) {
        self.transcript.push(line.to_string());
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            tracing::debug!("skipping malformed jsonl line");
            return;
        };
        match value.get("type").and_then(Value::as_str) {
            Some("assistant") => {
                if let Some(text) = value.get("text").and_then(Value::as_str) {
                    self.assistant.push(text.to_string());
                }
            }
            Some("usage") => {
                if let Some(tokens) = value.get("tokens").and_then(Value::as_u64) {
                    self.tokens = tokens;
                }
            }
            Some("error") => {
                if let Some(message) = value.get("message").and_then(Value::as_str) {
                    self.errors.push(message.to_string());
                }
            }
            _ => {}
        }
    }

    fn output(&self) -> String {
        self.assistant.join("\n")
    }
}

/// Apply a budget; the marker names the artifact with the full output.
fn truncate_output(
    output: String,
    budget: OutputBudget,
    artifact: Option<&PathBuf>,
) -> (String, bool) {
    let over_lines = output.lines().count() > budget.max_lines;
    let over_bytes = output.len() > budget.max_bytes;
    if !over_lines && !over_bytes {
        return (output, false);
    }

    let line_capped: String = output
        .lines()
        .take(budget.max_lines)
        .collect::<Vec<_>>()
        .join("\n");
    let mut cut = line_capped.len().min(budget.max_bytes);
    while cut > 0 && !line_capped.is_char_boundary(cut) {
        cut -= 1;
    }
    let fallback = match artifact {
        Some(path) => format!("; full output at {}", path.display()),
        None => String::new(),
    };
    (
        format!("{}\n[output truncated{fallback}]", &line_capped[..cut]),
        true,
    )
}

/// Real spawner invoking the `pi` model runner.
pub struct PiSpawner {
    /// Agent definitions known to the host runtime.
    agents: Vec<String>,
    cancel: CancellationToken,
}

impl PiSpawner {
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents, cancel: CancellationToken::new() }
    }

    /// Token aborting every child this spawner started.
    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn terminate(child: &mut tokio::process::Child) {
        if let Some(pid) = child.id() {
            if let Ok(raw) = i32::try_from(pid) {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(raw),
                    nix::sys::signal::Signal::SIGTERM,
                );
            }
        }
        let graceful = tokio::time::timeout(KILL_GRACE, child.wait()).await;
        if graceful.is_err() {
            let _ = child.kill().await;
        }
    }
}

#[async_trait::async_trait]
impl Spawner for PiSpawner {
    fn has_agent(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }

    async fn run(&self, request: SpawnRequest) -> Result<AgentRun, SpawnError> {
        let started = Instant::now();
        let spawn_err = |source| SpawnError::Spawn { agent: request.agent.clone(), source };
        let io_err = |source| SpawnError::Io { agent: request.agent.clone(), source };

        request.artifacts.write(&request, "input.md", &request.prompt);

        let mut child = tokio::process::Command::new("pi")
            .args(["--mode", "json", "--agent", &request.agent, "-p", &request.prompt])
            .current_dir(&request.cwd)
            .env(ENV_CREW_CHILD, "1")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let mut collected = Collected::default();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    line = lines.next_line() => match line.map_err(io_err)? {
                        Some(line) => collected.feed(&line),
                        None => break,
                    },
                    _ = self.cancel.cancelled() => {
                        Self::terminate(&mut child).await;
                        return Err(SpawnError::Aborted { agent: request.agent.clone() });
                    }
                }
            }
        }
        let status = child.wait().await.map_err(io_err)?;

        let raw = collected.output();
        request.artifacts.write(&request, "output.md", &raw);
        request.artifacts.write(&request, "jsonl", &collected.transcript.join("\n"));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let exit_code = status.code();
        if !status.success() && raw.is_empty() {
            let message = collected.errors.join("; ");
            return Err(SpawnError::Failed { agent: request.agent.clone(), exit_code, message });
        }

        let (output, truncated) =
            truncate_output(raw, request.budget(), request.artifacts.output_path(&request).as_ref());
        let run = AgentRun {
            agent: request.agent.clone(),
            idx: request.idx,
            output,
            truncated,
            tokens: collected.tokens,
            elapsed_ms,
            exit_code,
        };
        request.artifacts.write(
            &request,
            "metadata.json",
            &serde_json::json!({
                "agent": run.agent,
                "idx": run.idx,
                "role": request.role,
                "tokens": run.tokens,
                "elapsedMs": run.elapsed_ms,
                "exitCode": run.exit_code,
                "truncated": run.truncated,
            })
            .to_string(),
        );
        Ok(run)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSpawner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted spawner for orchestrator tests: queue outputs per agent
    /// name; requests are recorded for assertions.
    #[derive(Default)]
    pub struct FakeSpawner {
        agents: Vec<String>,
        outputs: Mutex<HashMap<String, Vec<Result<String, String>>>>,
        pub requests: Mutex<Vec<SpawnRequest>>,
    }

    impl FakeSpawner {
        pub fn with_agents(agents: &[&str]) -> Self {
            Self {
                agents: agents.iter().map(|a| (*a).to_string()).collect(),
                ..Default::default()
            }
        }

        /// Queue the next output for `agent` (FIFO per agent).
        pub fn script(&self, agent: &str, output: &str) {
            self.outputs
                .lock()
                .entry(agent.to_string())
                .or_default()
                .push(Ok(output.to_string()));
        }

        pub fn script_failure(&self, agent: &str, message: &str) {
            self.outputs
                .lock()
                .entry(agent.to_string())
                .or_default()
                .push(Err(message.to_string()));
        }

        pub fn prompts_for(&self, agent: &str) -> Vec<String> {
            self.requests
                .lock()
                .iter()
                .filter(|r| r.agent == agent)
                .map(|r| r.prompt.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl Spawner for FakeSpawner {
        fn has_agent(&self, agent: &str) -> bool {
            self.agents.iter().any(|a| a == agent)
        }

        async fn run(&self, request: SpawnRequest) -> Result<AgentRun, SpawnError> {
            self.requests.lock().push(request.clone());
            let next = {
                let mut outputs = self.outputs.lock();
                outputs.get_mut(&request.agent).and_then(|queue| {
                    if queue.is_empty() {
                        None
                    } else {
                        Some(queue.remove(0))
                    }
                })
            };
            match next {
                Some(Ok(output)) => {
                    let (output, truncated) = truncate_output(output, request.budget(), None);
                    Ok(AgentRun {
                        agent: request.agent.clone(),
                        idx: request.idx,
                        output,
                        truncated,
                        tokens: 10,
                        elapsed_ms: 1,
                        exit_code: Some(0),
                    })
                }
                Some(Err(message)) => Err(SpawnError::Failed {
                    agent: request.agent.clone(),
                    exit_code: Some(1),
                    message,
                }),
                None => Err(SpawnError::Failed {
                    agent: request.agent.clone(),
                    exit_code: Some(1),
                    message: "no scripted output".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
