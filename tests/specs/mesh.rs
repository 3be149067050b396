// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handshake and message-passing specs.

use crate::prelude::*;
use std::time::Duration;

/// Two processes join an empty registry, get distinct generated names,
/// and a message from B reaches A's deliver callback.
#[tokio::test]
async fn handshake_and_first_message() {
    let mesh = Mesh::new();

    let a = mesh.agent("sess-a");
    let joined_a = ok(&a, serde_json::json!({"action": "join"})).await;
    let name_a = joined_a.details.data["name"].as_str().unwrap().to_string();
    assert!(!name_a.is_empty(), "generated name returned");
    assert!(mesh.base.path().join("registry").join(format!("{name_a}.json")).exists());

    let b = mesh.agent("sess-b");
    let joined_b = ok(&b, serde_json::json!({"action": "join"})).await;
    let name_b = joined_b.details.data["name"].as_str().unwrap().to_string();
    assert_ne!(name_a, name_b, "B gets a distinct name with A present");

    ok(&b, serde_json::json!({"action": "send", "to": name_a, "message": "hi"})).await;

    let delivered = wait_for(Duration::from_secs(5), || {
        mesh.host
            .steers
            .lock()
            .iter()
            .any(|s| s.contains(&format!("from {name_b}")) && s.contains("hi"))
    })
    .await;
    assert!(delivered, "deliver callback fired: {:?}", mesh.host.steers.lock());

    a.leave();
    b.leave();
}

/// Messages within one inbox arrive in filename (send) order.
#[tokio::test]
async fn messages_deliver_in_order() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "Recv"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "Sender"})).await;

    for n in 0..5 {
        // Distinct millis per file keeps filename order meaningful.
        tokio::time::sleep(Duration::from_millis(3)).await;
        ok(&b, serde_json::json!({
            "action": "send", "to": "Recv", "message": format!("orderly-{n}")
        }))
        .await;
    }

    let all_in = wait_for(Duration::from_secs(5), || mesh.host.steers.lock().len() >= 5).await;
    assert!(all_in, "all five messages delivered");
    let steers = mesh.host.steers.lock();
    let positions: Vec<usize> = (0..5)
        .map(|n| {
            steers
                .iter()
                .position(|s| s.contains(&format!("orderly-{n}")))
                .unwrap_or_else(|| panic!("orderly-{n} missing from {steers:?}"))
        })
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "in-order delivery: {steers:?}");
    drop(steers);

    a.leave();
    b.leave();
}

/// Clean shutdown removes the registration; peers stop seeing the agent.
#[tokio::test]
async fn leave_cleans_registry_and_inbox() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "Alpha"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "Beta"})).await;

    let listing = ok(&b, serde_json::json!({"action": "list"})).await;
    assert!(listing.text.contains("Alpha"));

    a.leave();
    assert!(!mesh.base.path().join("registry").join("Alpha.json").exists());
    assert!(!mesh.base.path().join("inbox").join("sess-a").exists());

    let resp = b
        .handle(&input(serde_json::json!({"action": "send", "to": "Alpha", "message": "x"})))
        .await;
    assert!(resp.is_error(), "sending to a departed agent fails");
    b.leave();
}
