// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn message_ids_are_unique() {
    let a = InboxMessage::new("A", "B", "hi", 1);
    let b = InboxMessage::new("A", "B", "hi", 1);
    assert_ne!(a.id, b.id);
}

#[test]
fn message_round_trips() {
    let mut msg = InboxMessage::new("Wren", "Otter", "hello", 99);
    msg.reply_to = Some("prior-id".into());
    let json = serde_json::to_string(&msg).unwrap();
    let parsed: InboxMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
}

#[parameterized(
    plain = { "hello world", "hello world" },
    color = { "\u{1b}[31mred\u{1b}[0m text", "red text" },
    cursor = { "a\u{1b}[2Kb", "ab" },
    osc_title = { "\u{1b}]0;title\u{7}body", "body" },
    osc_st_terminated = { "\u{1b}]8;;url\u{1b}\\link", "link" },
    two_byte = { "x\u{1b}cy", "xy" },
    trailing_esc = { "end\u{1b}", "end" },
)]
fn ansi_stripping(input: &str, expected: &str) {
    assert_eq!(strip_ansi(input), expected);
}

#[test]
fn display_text_strips() {
    let msg = InboxMessage::new("A", "B", "\u{1b}[1mbold\u{1b}[0m", 1);
    assert_eq!(msg.display_text(), "bold");
}
