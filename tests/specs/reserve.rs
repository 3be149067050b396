// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reservation enforcement specs: writes block, reads never do.

use crate::prelude::*;

/// A reserves `src/auth/`; B's edit is blocked with A named, B's read is
/// untouched; after release the edit proceeds.
#[tokio::test]
async fn reservation_blocks_writes_not_reads() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "Alpha"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "Beta"})).await;

    ok(&a, serde_json::json!({
        "action": "reserve", "reserve": "src/auth/", "reason": "reworking login"
    }))
    .await;

    // Write-class call: blocked with a structured conflict naming Alpha.
    let conflict = b.check_write("src/auth/login.ts").expect("edit must be blocked");
    assert_eq!(conflict.peer.name, "Alpha");
    assert!(conflict.message().contains("Alpha"));
    assert!(conflict.message().contains("reworking login"));

    // Reads are never checked: nothing in the API consults reservations
    // for read-class operations, and unrelated writes pass.
    assert!(b.check_write("src/payments/checkout.ts").is_none());

    // Release, wait out B's one-second listing cache, retry: proceeds.
    ok(&a, serde_json::json!({"action": "release", "release": "src/auth/"})).await;
    let freed = wait_for(std::time::Duration::from_secs(3), || {
        b.check_write("src/auth/login.ts").is_none()
    })
    .await;
    assert!(freed, "edit proceeds after release");

    a.leave();
    b.leave();
}

/// Nested reservation semantics: the subtree matches, sibling names that
/// merely share a prefix do not.
#[tokio::test]
async fn directory_reservations_cover_subtrees_exactly() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "Alpha"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "Beta"})).await;

    ok(&a, serde_json::json!({"action": "reserve", "reserve": "src/auth/"})).await;

    assert!(b.check_write("src/auth/deep/nested/file.rs").is_some());
    assert!(b.check_write("src/auth").is_some(), "the directory itself is covered");
    assert!(b.check_write("src/auth2/file.rs").is_none(), "prefix sibling is free");

    a.leave();
    b.leave();
}

/// A file reservation covers exactly one path.
#[tokio::test]
async fn file_reservations_are_exact() {
    let mesh = Mesh::new();
    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "Alpha"})).await;
    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "Beta"})).await;

    ok(&a, serde_json::json!({"action": "reserve", "reserve": "Cargo.toml"})).await;
    assert!(b.check_write("Cargo.toml").is_some());
    assert!(b.check_write("Cargo.lock").is_none());

    a.leave();
    b.leave();
}
