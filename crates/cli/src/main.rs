// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `pim`: command-line surface over the messenger action router.
//!
//! Each invocation joins the mesh as an ephemeral agent, performs one
//! action, and leaves — except `watch`, which stays registered and
//! prints delivered messages until interrupted. Host runtimes embed
//! `pim-engine` directly; this binary exists for humans and scripts.

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::Cli;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Logs go to stderr so stdout stays machine-readable (--json).
    let filter = EnvFilter::try_from_env("PIM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    commands::execute(cli).await
}
