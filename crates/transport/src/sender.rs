// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound message path.
//!
//! The sender validates the recipient (valid name, live registration)
//! and writes the message file atomically. It never waits for delivery.

use pim_core::{validate_name, Clock, InboxMessage, NameError, Registration};
use pim_storage::{pid_alive, write_json_atomic, RegistryStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("no agent named {0}")]
    NotFound(String),
    #[error("agent {0} is registered but its process is gone")]
    NotActive(String),
    #[error("registration for {0} is unreadable")]
    InvalidRegistration(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate `to` and write the message into its inbox.
///
/// Returns the recipient's registration so callers can log or decorate.
pub fn send_message<C: Clock>(
    registry: &RegistryStore<C>,
    clock: &C,
    from: &str,
    to: &str,
    text: &str,
    reply_to: Option<String>,
) -> Result<(InboxMessage, Registration), SendError> {
    validate_name(to)?;
    let reg = registry.load(to).ok_or_else(|| SendError::NotFound(to.to_string()))?;
    if reg.session_id.is_empty() {
        return Err(SendError::InvalidRegistration(to.to_string()));
    }
    if !pid_alive(reg.pid) {
        return Err(SendError::NotActive(to.to_string()));
    }

    let mut message = InboxMessage::new(from, to, text, clock.epoch_ms());
    message.reply_to = reply_to;

    let inbox = registry.paths().inbox_dir(&reg.session_id);
    let filename = message_filename(message.sent_at);
    write_json_atomic(&inbox.join(filename), &message)?;
    tracing::debug!(%from, %to, id = %message.id, "message written");
    Ok((message, reg))
}

/// `<ts>-<rand>.json`: zero-padded millis keep filename order equal to
/// send order within one inbox.
fn message_filename(sent_at: u64) -> String {
    format!("{sent_at:013}-{}.json", nanoid::nanoid!(6))
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
