// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-transport: Inbox message passing over the shared filesystem.
//!
//! Senders drop message files atomically into the recipient's
//! session-keyed inbox directory; each process watches its own inbox and
//! delivers-then-deletes. Fire-and-forget with at-least-once semantics at
//! the filesystem and exactly-once effect at the consumer.

pub mod cues;
pub mod inbox;
pub mod sender;

pub use cues::FirstContactCues;
pub use inbox::{InboxWatcher, MessageHandler, DEBOUNCE, MAX_WATCHER_RETRIES, POLL_INTERVAL};
pub use sender::{send_message, SendError};
