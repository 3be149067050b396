// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-core: Pure types and logic for the pi-messenger coordination mesh.
//!
//! Everything in this crate is filesystem-free: name generation, path
//! normalization, registration/message/claim records, presence derivation,
//! task lifecycle rules, and the clock abstraction. Persistence and
//! process concerns live in `pim-storage` and above.

pub mod macros;

pub mod agent;
pub mod clock;
pub mod feed;
pub mod id;
pub mod message;
pub mod name;
pub mod pathspec;
pub mod presence;
pub mod swarm;
pub mod task;
pub mod time_fmt;

pub use agent::{
    ActivityRecord, PeerSummary, Registration, Reservation, SessionStats, MAX_RECENT_FILES,
};
#[cfg(any(test, feature = "test-support"))]
pub use agent::RegistrationBuilder;
pub use clock::{Clock, FakeClock, SystemClock};
pub use feed::{FeedEvent, FeedKind, DEFAULT_FEED_RETENTION};
pub use id::{short, RunId};
pub use message::{strip_ansi, InboxMessage};
pub use name::{generate_name, validate_name, NameError, NameTheme, NameWords, MAX_NAME_LEN};
pub use pathspec::{normalize_path, ReservationSpec};
pub use presence::{
    derive_status, PresenceStatus, ACTIVE_WINDOW_MS, DEFAULT_STUCK_THRESHOLD_SECS, IDLE_WINDOW_MS,
};
pub use swarm::{agent_claim, Claim, ClaimMap, Completion, CompletionMap};
pub use task::{
    is_ready, ready_tasks, task_number, validate_graph, Plan, ReviewRecord, ReviewVerdict, Task,
    TaskGraphError, TaskStatus,
};
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use time_fmt::format_elapsed_ms;
