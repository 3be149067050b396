// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orientation cues attached to delivered messages.
//!
//! First contact is tracked per (sender name, sender session id): a name
//! recycled by a new process counts as a new correspondent, so its intro
//! is not suppressed.

use parking_lot::Mutex;
use pim_core::{InboxMessage, PeerSummary};
use pim_storage::MessengerConfig;
use std::collections::HashSet;

#[derive(Default)]
pub struct FirstContactCues {
    seen_senders: Mutex<HashSet<(String, String)>>,
}

impl FirstContactCues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the display text for a delivered message, appending sender
    /// details on first contact and the configured reply hint.
    pub fn render(
        &self,
        config: &MessengerConfig,
        message: &InboxMessage,
        sender: Option<&PeerSummary>,
        sender_session: Option<&str>,
    ) -> String {
        let mut text = message.display_text();

        let first_contact = match sender_session {
            Some(session) => self
                .seen_senders
                .lock()
                .insert((message.from.clone(), session.to_string())),
            // Without a session id we cannot distinguish a recycled name;
            // treat every message as first contact rather than suppress.
            None => true,
        };

        if first_contact && config.sender_details_on_first_contact {
            if let Some(peer) = sender {
                let branch = peer
                    .branch
                    .as_deref()
                    .map(|b| format!(" on {b}"))
                    .unwrap_or_default();
                text.push_str(&format!(
                    "\n\n[{} is working in {}{branch}, model {}]",
                    peer.name,
                    peer.cwd.display(),
                    peer.model
                ));
            }
            if let Some(context) = &config.registration_context {
                text.push_str(&format!("\n{context}"));
            }
        }
        if let Some(hint) = &config.reply_hint {
            text.push_str(&format!("\n{hint}"));
        }
        text
    }
}

#[cfg(test)]
#[path = "cues_tests.rs"]
mod tests;
