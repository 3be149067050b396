// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn ok_response_has_no_error() {
    let resp = ActionResponse::ok("joined as Wren");
    assert!(!resp.is_error());
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["text"], "joined as Wren");
    assert_eq!(value["details"], json!({}));
}

#[test]
fn error_code_serializes_snake_case() {
    let resp = ActionResponse::error("already claimed", ErrorCode::AlreadyClaimed);
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["details"]["error"], "already_claimed");
}

#[test]
fn error_with_context_flattens_data() {
    let resp = ActionResponse::error_with(
        "task TASK-1 is claimed by Wren",
        ErrorCode::AlreadyClaimed,
        json!({"taskId": "TASK-1", "holder": "Wren"}),
    );
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["details"]["error"], "already_claimed");
    assert_eq!(value["details"]["holder"], "Wren");
}

#[test]
fn with_data_round_trips() {
    let resp = ActionResponse::with("2 agents", json!({"agents": ["A", "B"]}));
    let json = serde_json::to_string(&resp).unwrap();
    let parsed: ActionResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, resp);
    assert_eq!(parsed.details.data["agents"], json!(["A", "B"]));
}

#[test]
fn error_code_display_matches_wire() {
    assert_eq!(ErrorCode::NotRegistered.to_string(), "not_registered");
    assert_eq!(ErrorCode::NoPrd.to_string(), "no_prd");
}
