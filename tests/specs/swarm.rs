// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Swarm claim/complete specs.

use crate::prelude::*;
use pim_wire::ErrorCode;

/// Claim contention across two agents, the one-claim-per-agent wall, and
/// claiming again after completion.
#[tokio::test]
async fn claim_contention() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "A"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "B"})).await;

    ok(&a, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;

    let resp = b
        .handle(&input(serde_json::json!({
            "action": "claim", "spec": "specX.md", "taskId": "TASK-1"
        })))
        .await;
    assert_eq!(resp.details.error, Some(ErrorCode::AlreadyClaimed));
    assert_eq!(resp.details.data["holder"], "A");

    ok(&b, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-2"})).await;

    let resp = b
        .handle(&input(serde_json::json!({
            "action": "claim", "spec": "specX.md", "taskId": "TASK-3"
        })))
        .await;
    assert_eq!(resp.details.error, Some(ErrorCode::AlreadyHaveClaim));
    assert_eq!(resp.details.data["taskId"], "TASK-2");

    let done = ok(&a, serde_json::json!({
        "action": "complete", "spec": "specX.md", "taskId": "TASK-1", "notes": "done"
    }))
    .await;
    assert_eq!(done.details.data["completion"]["notes"], "done");

    ok(&a, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-3"})).await;

    a.leave();
    b.leave();
}

/// A dead claimant's claim is filtered from views and its slot reclaimed.
#[tokio::test]
async fn stale_claims_are_collected() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "A"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "B"})).await;

    ok(&a, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;

    // A dies without unclaiming.
    a.leave();

    let listing = ok(&b, serde_json::json!({"action": "swarm"})).await;
    assert!(
        !listing.text.contains("TASK-1"),
        "stale claim filtered from the swarm view: {}",
        listing.text
    );

    ok(&b, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;
    b.leave();
}

/// Completions survive the completer's death; the slot stays terminal.
#[tokio::test]
async fn completions_are_terminal_across_deaths() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "A"})).await;

    ok(&a, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;
    ok(&a, serde_json::json!({
        "action": "complete", "spec": "specX.md", "taskId": "TASK-1"
    }))
    .await;
    a.leave();

    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "B"})).await;
    let resp = b
        .handle(&input(serde_json::json!({
            "action": "claim", "spec": "specX.md", "taskId": "TASK-1"
        })))
        .await;
    assert_eq!(resp.details.error, Some(ErrorCode::AlreadyCompleted));
    b.leave();
}

/// Unclaim frees the slot for someone else.
#[tokio::test]
async fn unclaim_hands_off() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "A"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "B"})).await;

    ok(&a, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;
    ok(&a, serde_json::json!({"action": "unclaim", "spec": "specX.md", "taskId": "TASK-1"})).await;
    ok(&b, serde_json::json!({"action": "claim", "spec": "specX.md", "taskId": "TASK-1"})).await;

    a.leave();
    b.leave();
}
