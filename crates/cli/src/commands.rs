// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand definitions and their mapping onto router actions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pim_core::SystemClock;
use pim_engine::{HostEvents, Messenger, PiSpawner, SessionInfo, Spawner};
use pim_storage::{MessengerConfig, MessengerPaths};
use pim_wire::{ActionInput, ActionResponse};
use std::sync::Arc;

/// Crew agent definitions the `pi` runner ships with.
const DEFAULT_AGENTS: &[&str] = &["scout", "planner", "worker", "reviewer", "analyst"];

#[derive(Parser)]
#[command(name = "pim", about = "File-based coordination mesh for coding agents", version)]
pub struct Cli {
    /// Agent name to join as (default: generated).
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Print the structured details instead of the text summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show active agents in the mesh.
    List,
    /// Show one agent's full card.
    Whois { agent: String },
    /// Show own presence and claim.
    Status,
    /// Show recent activity feed lines.
    Feed {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Set (or clear) the own status message.
    SetStatus { message: Option<String> },
    /// Send a message to one or more agents.
    Send {
        to: Vec<String>,
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        reply_to: Option<String>,
    },
    /// Send a message to every active agent.
    Broadcast {
        #[arg(short, long)]
        message: String,
    },
    /// Reserve paths for exclusive writes.
    Reserve {
        paths: Vec<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Release reservations (all of them with --all).
    Release {
        paths: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Claim a task on a spec.
    Claim {
        spec: String,
        task_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Release an own claim.
    Unclaim { spec: String, task_id: String },
    /// Complete a claimed task.
    Complete {
        spec: String,
        task_id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show swarm claims and completions.
    Swarm {
        #[arg(long)]
        spec: Option<String>,
    },
    /// Task lifecycle operations.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Create the project plan from a PRD.
    Plan {
        #[arg(long)]
        prd: Option<String>,
    },
    /// Run one wave of workers over ready tasks.
    Work {
        #[arg(long)]
        autonomous: bool,
    },
    /// Review a task implementation or the whole plan.
    Review { target: Option<String> },
    /// Generate stakeholder interview questions.
    Interview,
    /// Propagate a completed task's outcome into dependent specs.
    Sync { task_id: String },
    /// Crew management.
    #[command(subcommand)]
    Crew(CrewCommand),
    /// Add an auto-register path to the global config.
    AutoRegisterPath { path: String },
    /// Stay registered and print delivered messages until interrupted.
    Watch,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },
    Show { task_id: String },
    List,
    Start { task_id: String },
    Done {
        task_id: String,
        #[arg(long)]
        summary: Option<String>,
    },
    Block {
        task_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Unblock { task_id: String },
    Ready,
    Reset {
        task_id: String,
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand)]
pub enum CrewCommand {
    Status,
    Agents,
    Install,
    Uninstall,
    Validate,
}

/// Prints steers and notifications for a human operator.
struct TerminalHost;

impl HostEvents for TerminalHost {
    fn steer(&self, text: String) {
        println!("{text}");
    }
    fn notify(&self, title: &str, body: &str) {
        eprintln!("[{title}] {body}");
    }
}

fn build_messenger() -> Result<Messenger<SystemClock>> {
    let paths = MessengerPaths::resolve();
    let config_path = MessengerPaths::global_config()
        .context("cannot resolve the home directory for configuration")?;
    let config = MessengerConfig::load(&config_path);
    let cwd = std::env::current_dir().context("cannot resolve cwd")?;
    let session = SessionInfo {
        session_id: format!("cli-{}", uuid::Uuid::new_v4()),
        cwd,
        model: std::env::var("PI_MODEL").unwrap_or_else(|_| "cli".to_string()),
        human: true,
    };
    let spawner = PiSpawner::new(DEFAULT_AGENTS.iter().map(|a| (*a).to_string()).collect());
    Ok(Messenger::new(
        paths,
        config,
        session,
        Arc::new(spawner) as Arc<dyn Spawner>,
        Arc::new(TerminalHost),
        SystemClock,
    )
    .with_config_path(config_path))
}

fn print_response(response: &ActionResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("{}", response.text);
    }
    if response.is_error() {
        std::process::exit(2);
    }
    Ok(())
}

/// Map a subcommand onto the router's parameter object.
fn to_input(command: &Command) -> ActionInput {
    let mut input = ActionInput::default();
    match command {
        Command::List => input.action = Some("list".into()),
        Command::Whois { agent } => {
            input.action = Some("whois".into());
            input.name = Some(agent.clone());
        }
        Command::Status => input.action = Some("status".into()),
        Command::Feed { limit } => {
            input.action = Some("feed".into());
            input.limit = Some(*limit);
        }
        Command::SetStatus { message } => {
            input.action = Some("set_status".into());
            input.status = message.clone();
        }
        Command::Send { to, message, reply_to } => {
            input.action = Some("send".into());
            input.to = to.clone();
            input.message = Some(message.clone());
            input.reply_to = reply_to.clone();
        }
        Command::Broadcast { message } => {
            input.action = Some("broadcast".into());
            input.message = Some(message.clone());
        }
        Command::Reserve { paths, reason } => {
            input.action = Some("reserve".into());
            input.reserve = paths.clone();
            input.reason = reason.clone();
        }
        Command::Release { paths, all } => {
            input.action = Some("release".into());
            input.release = paths.clone();
            input.release_all = *all;
        }
        Command::Claim { spec, task_id, reason } => {
            input.action = Some("claim".into());
            input.spec = Some(spec.clone());
            input.task_id = Some(task_id.clone());
            input.reason = reason.clone();
        }
        Command::Unclaim { spec, task_id } => {
            input.action = Some("unclaim".into());
            input.spec = Some(spec.clone());
            input.task_id = Some(task_id.clone());
        }
        Command::Complete { spec, task_id, notes } => {
            input.action = Some("complete".into());
            input.spec = Some(spec.clone());
            input.task_id = Some(task_id.clone());
            input.notes = notes.clone();
        }
        Command::Swarm { spec } => {
            input.action = Some("swarm".into());
            input.spec = spec.clone();
        }
        Command::Task(task) => fill_task_input(&mut input, task),
        Command::Plan { prd } => {
            input.action = Some("plan".into());
            input.prd = prd.clone();
        }
        Command::Work { autonomous } => {
            input.action = Some("work".into());
            input.autonomous = *autonomous;
        }
        Command::Review { target } => {
            input.action = Some("review".into());
            input.target = target.clone();
        }
        Command::Interview => input.action = Some("interview".into()),
        Command::Sync { task_id } => {
            input.action = Some("sync".into());
            input.task_id = Some(task_id.clone());
        }
        Command::Crew(crew) => {
            input.action = Some(
                match crew {
                    CrewCommand::Status => "crew.status",
                    CrewCommand::Agents => "crew.agents",
                    CrewCommand::Install => "crew.install",
                    CrewCommand::Uninstall => "crew.uninstall",
                    CrewCommand::Validate => "crew.validate",
                }
                .into(),
            );
        }
        Command::AutoRegisterPath { path } => {
            input.action = Some("autoRegisterPath".into());
            input.path = Some(path.clone());
        }
        Command::Watch => input.action = Some("status".into()),
    }
    input
}

fn fill_task_input(input: &mut ActionInput, task: &TaskCommand) {
    match task {
        TaskCommand::Create { title, description, depends_on } => {
            input.action = Some("task.create".into());
            input.title = Some(title.clone());
            input.description = description.clone();
            input.depends_on = depends_on.clone();
        }
        TaskCommand::Show { task_id } => {
            input.action = Some("task.show".into());
            input.task_id = Some(task_id.clone());
        }
        TaskCommand::List => input.action = Some("task.list".into()),
        TaskCommand::Start { task_id } => {
            input.action = Some("task.start".into());
            input.task_id = Some(task_id.clone());
        }
        TaskCommand::Done { task_id, summary } => {
            input.action = Some("task.done".into());
            input.task_id = Some(task_id.clone());
            input.summary = summary.clone();
        }
        TaskCommand::Block { task_id, reason } => {
            input.action = Some("task.block".into());
            input.task_id = Some(task_id.clone());
            input.reason = reason.clone();
        }
        TaskCommand::Unblock { task_id } => {
            input.action = Some("task.unblock".into());
            input.task_id = Some(task_id.clone());
        }
        TaskCommand::Ready => input.action = Some("task.ready".into()),
        TaskCommand::Reset { task_id, cascade } => {
            input.action = Some("task.reset".into());
            input.task_id = Some(task_id.clone());
            input.cascade = *cascade;
        }
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let messenger = build_messenger()?;

    let join_input = {
        let mut input = ActionInput { action: Some("join".into()), ..Default::default() };
        input.name = cli.name.clone();
        input
    };
    let joined = messenger.handle(&join_input).await;
    if joined.is_error() {
        print_response(&joined, cli.json)?;
        return Ok(());
    }

    if matches!(cli.command, Command::Watch) {
        eprintln!(
            "watching as {}; messages print to stdout (ctrl-c to leave)",
            messenger.name().unwrap_or_default()
        );
        tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
        messenger.leave();
        return Ok(());
    }

    let response = messenger.handle(&to_input(&cli.command)).await;
    messenger.leave();
    print_response(&response, cli.json)?;
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
