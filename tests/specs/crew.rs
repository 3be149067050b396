// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crew orchestration specs: plan → work → review.

use crate::prelude::*;

const PLANNER_OUTPUT: &str = r#"
The PRD splits into three tasks.

```tasks-json
[
  {"title": "Schema", "description": "Create the tables", "dependsOn": []},
  {"title": "API", "description": "Build the endpoints", "dependsOn": ["Schema"]},
  {"title": "UI", "description": "Build the screens", "dependsOn": ["Schema"]}
]
```
"#;

/// Plan → autonomous work loop: wave 1 runs the root task, wave 2 runs
/// both dependents in parallel, then the loop stops as completed.
#[tokio::test]
async fn plan_then_autonomous_work_to_completion() {
    let mesh = Mesh::with_agents(&["planner", "worker"]);
    mesh.write_prd("# Product\n1. store data\n2. serve api\n3. show ui\n");

    let agent = mesh.agent("sess-a");
    ok(&agent, serde_json::json!({"action": "join", "name": "Lead"})).await;

    mesh.spawner.script("planner", PLANNER_OUTPUT);
    let plan = ok(&agent, serde_json::json!({"action": "plan"})).await;
    assert_eq!(plan.details.data["tasks"].as_array().unwrap().len(), 3);

    // Wave 1: only task-1 is ready.
    mesh.spawner.script("worker", "schema built");
    let wave1 = ok(&agent, serde_json::json!({"action": "work", "autonomous": true})).await;
    let wave = wave1.details.data["wave"].as_array().unwrap();
    assert_eq!(wave.len(), 1);
    assert_eq!(wave[0]["taskId"], "task-1");
    assert_eq!(wave[0]["status"], "succeeded");
    assert_eq!(wave1.details.data["continue"], true);

    // The continuation steer asks the host to re-invoke work.
    assert!(mesh
        .host
        .steers
        .lock()
        .iter()
        .any(|s| s.contains("continue with action=work")));

    // Wave 2: task-2 and task-3 in parallel (worker concurrency 2).
    mesh.spawner.script("worker", "api built");
    mesh.spawner.script("worker", "ui built");
    let wave2 = ok(&agent, serde_json::json!({"action": "work", "autonomous": true})).await;
    let wave = wave2.details.data["wave"].as_array().unwrap();
    assert_eq!(wave.len(), 2);
    assert_eq!(wave2.details.data["continue"], false);
    assert_eq!(wave2.details.data["autonomous"]["stop_reason"], "completed");

    let status = ok(&agent, serde_json::json!({"action": "crew.status"})).await;
    assert!(status.text.contains("3/3 done"), "{}", status.text);

    agent.leave();
}

/// Worker retry carries the reviewer's issues into the next attempt's
/// prompt; a SHIP verdict persists on the task.
#[tokio::test]
async fn review_feedback_reaches_retry_prompt() {
    let mesh = Mesh::with_agents(&["planner", "worker", "reviewer"]);
    mesh.write_prd("# Product\nOne thing.\n");

    let agent = mesh.agent("sess-a");
    ok(&agent, serde_json::json!({"action": "join", "name": "Lead"})).await;

    mesh.spawner.script(
        "planner",
        "```tasks-json\n[{\"title\": \"Only\", \"description\": \"Build it\", \"dependsOn\": []}]\n```",
    );
    ok(&agent, serde_json::json!({"action": "plan"})).await;

    mesh.spawner.script("worker", "first attempt output");
    ok(&agent, serde_json::json!({"action": "work"})).await;

    mesh.spawner.script(
        "reviewer",
        "Verdict: NEEDS_WORK\nIncomplete.\n\n## Issues\n- I1 missing timeout\n- I2 no tests\n",
    );
    let review = ok(&agent, serde_json::json!({"action": "review", "target": "task-1"})).await;
    assert_eq!(review.details.data["verdict"], "NEEDS_WORK");

    // Retry: attempt 2's prompt carries I1 and I2 explicitly.
    ok(&agent, serde_json::json!({"action": "task.reset", "taskId": "task-1"})).await;
    mesh.spawner.script("worker", "second attempt output");
    ok(&agent, serde_json::json!({"action": "work"})).await;

    let prompts = mesh.spawner.prompts_for("worker");
    let retry_prompt = prompts.last().unwrap();
    assert!(retry_prompt.contains("attempt 2"));
    assert!(retry_prompt.contains("I1 missing timeout"));
    assert!(retry_prompt.contains("I2 no tests"));

    // On SHIP the verdict persists on the task.
    mesh.spawner.script("reviewer", "Verdict: SHIP\nGood now.");
    ok(&agent, serde_json::json!({"action": "review", "target": "task-1"})).await;
    let show = ok(&agent, serde_json::json!({"action": "task.show", "taskId": "task-1"})).await;
    assert_eq!(show.details.data["lastReview"]["verdict"], "ship");

    agent.leave();
}

/// A second process planning the same project gets `plan_exists` with
/// the original PRD path.
#[tokio::test]
async fn second_plan_in_project_is_rejected() {
    let mesh = Mesh::with_agents(&["planner"]);
    mesh.write_prd("# Product\nOne thing.\n");

    let a = mesh.agent("sess-a");
    ok(&a, serde_json::json!({"action": "join", "name": "A"})).await;

    mesh.spawner.script(
        "planner",
        "```tasks-json\n[{\"title\": \"Only\", \"description\": \"x\", \"dependsOn\": []}]\n```",
    );
    ok(&a, serde_json::json!({"action": "plan"})).await;

    let b = mesh.agent("sess-b");
    ok(&b, serde_json::json!({"action": "join", "name": "B"})).await;
    let resp = b.handle(&input(serde_json::json!({"action": "plan"}))).await;
    assert_eq!(resp.details.error, Some(pim_wire::ErrorCode::PlanExists));

    a.leave();
    b.leave();
}
