// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn peer() -> PeerSummary {
    PeerSummary {
        name: "Wren".into(),
        cwd: "/work/app".into(),
        branch: Some("main".into()),
        model: "pi-large".into(),
    }
}

fn msg(text: &str) -> InboxMessage {
    InboxMessage::new("Wren", "Me", text, 1)
}

#[test]
fn first_contact_includes_sender_card_once() {
    let cues = FirstContactCues::new();
    let config = MessengerConfig::default();

    let first = cues.render(&config, &msg("hello"), Some(&peer()), Some("sess-w"));
    assert!(first.contains("hello"));
    assert!(first.contains("Wren is working in /work/app on main"));

    let second = cues.render(&config, &msg("again"), Some(&peer()), Some("sess-w"));
    assert!(second.contains("again"));
    assert!(!second.contains("working in"), "intro suppressed after first contact");
}

#[test]
fn new_session_with_same_name_is_new_contact() {
    let cues = FirstContactCues::new();
    let config = MessengerConfig::default();

    cues.render(&config, &msg("one"), Some(&peer()), Some("sess-1"));
    let after_recycle = cues.render(&config, &msg("two"), Some(&peer()), Some("sess-2"));
    assert!(after_recycle.contains("working in"), "recycled name gets a fresh intro");
}

#[test]
fn sender_details_can_be_disabled() {
    let cues = FirstContactCues::new();
    let config =
        MessengerConfig { sender_details_on_first_contact: false, ..Default::default() };
    let text = cues.render(&config, &msg("hi"), Some(&peer()), Some("sess-w"));
    assert!(!text.contains("working in"));
}

#[test]
fn reply_hint_always_appended() {
    let cues = FirstContactCues::new();
    let config = MessengerConfig {
        reply_hint: Some("Reply with pim send".into()),
        ..Default::default()
    };
    let a = cues.render(&config, &msg("one"), Some(&peer()), Some("sess-w"));
    let b = cues.render(&config, &msg("two"), Some(&peer()), Some("sess-w"));
    assert!(a.contains("Reply with pim send"));
    assert!(b.contains("Reply with pim send"));
}

#[test]
fn ansi_is_stripped_in_rendered_text() {
    let cues = FirstContactCues::new();
    let config = MessengerConfig::default();
    let text = cues.render(&config, &msg("\u{1b}[31mred\u{1b}[0m"), None, Some("sess-w"));
    assert!(text.starts_with("red"));
}
