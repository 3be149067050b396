// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-storage: Filesystem persistence for the coordination mesh.
//!
//! Everything shared between agent processes lives under a single base
//! directory and is mutated exclusively through write-temp-then-rename.
//! There is no daemon; the files are the database and dead-PID cleanup is
//! performed lazily by whichever reader gets there first.

pub mod config;
pub mod feed;
pub mod fsio;
pub mod lock;
pub mod paths;
pub mod proc;
pub mod registry;
pub mod reserve;
pub mod swarm;

pub use config::{ArtifactsConfig, ConcurrencyConfig, CrewConfig, MessengerConfig, PlanningConfig,
    ReviewConfig, WorkConfig};
pub use feed::FeedLog;
pub use fsio::{read_json, read_text, write_json_atomic, write_text_atomic, StoreError};
pub use lock::{holder_pid, DirLock, LockError, LockOptions, CREW_LOCK_OPTIONS, SWARM_LOCK_OPTIONS};
pub use paths::{MessengerPaths, ProjectPaths, ENV_AGENT_NAME, ENV_BASE_DIR, ENV_CREW_CHILD};
pub use proc::{current_pid, pid_alive};
pub use registry::{RegistryError, RegistryStore};
pub use reserve::{check_write_conflict, WriteConflict};
pub use swarm::{SwarmError, SwarmStore, SwarmView};
