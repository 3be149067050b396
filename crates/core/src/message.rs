// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox message record and display sanitization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One message file under `inbox/<session-id>/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Message identifier; consumers must be idempotent on this.
    pub id: String,
    pub from: String,
    pub to: String,
    /// Arbitrary UTF-8; strip ANSI before display.
    pub text: String,
    /// Epoch milliseconds at send time.
    pub sent_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl InboxMessage {
    pub fn new(from: impl Into<String>, to: impl Into<String>, text: impl Into<String>, sent_at: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            text: text.into(),
            sent_at,
            reply_to: None,
        }
    }

    /// Message text with ANSI escape sequences removed.
    pub fn display_text(&self) -> String {
        strip_ansi(&self.text)
    }
}

/// Remove ANSI escape sequences (CSI, OSC, and lone two-byte escapes).
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            // CSI: ESC [ params... final byte in @..~
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            // OSC: ESC ] ... terminated by BEL or ESC \
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{7}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // Two-byte escape (ESC c, ESC 7, ...)
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    out
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
