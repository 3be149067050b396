// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::FakeClock;
use tempfile::TempDir;

fn store(dir: &TempDir) -> CrewStore<FakeClock> {
    CrewStore::new(dir.path().to_path_buf(), FakeClock::new())
}

fn planned(dir: &TempDir) -> CrewStore<FakeClock> {
    let store = store(dir);
    store.create_plan("PRD.md").unwrap();
    store
}

#[test]
fn at_most_one_plan() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.create_plan("PRD.md").unwrap();
    match store.create_plan("OTHER.md").unwrap_err() {
        CrewError::PlanExists { prd_path } => assert_eq!(prd_path, "PRD.md"),
        other => panic!("expected PlanExists, got {other:?}"),
    }
}

#[test]
fn task_ids_are_sequential_and_survive_gaps() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    let t1 = store.create_task("one", "spec", vec![]).unwrap();
    let t2 = store.create_task("two", "spec", vec![]).unwrap();
    assert_eq!(t1.id, "task-1");
    assert_eq!(t2.id, "task-2");

    // Deleting a lower id must not recycle it.
    std::fs::remove_file(store.paths().task_json("task-1")).unwrap();
    let t3 = store.create_task("three", "spec", vec![]).unwrap();
    assert_eq!(t3.id, "task-3");
}

#[test]
fn create_task_requires_plan() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    assert!(matches!(
        store.create_task("x", "spec", vec![]),
        Err(CrewError::NoPlan)
    ));
}

#[test]
fn create_task_rejects_unknown_dependency() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    assert!(matches!(
        store.create_task("x", "spec", vec!["task-9".into()]),
        Err(CrewError::Graph(TaskGraphError::DependencyNotFound { .. }))
    ));
}

#[test]
fn lifecycle_happy_path_updates_counters() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();

    let started = store.start_task("task-1", Some("Wren")).unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert_eq!(started.attempts, 1);
    assert_eq!(started.assigned_to.as_deref(), Some("Wren"));

    let done = store
        .complete_task(
            "task-1",
            Some("implemented".into()),
            CompletionEvidence { commits: vec!["abc123".into()], ..Default::default() },
        )
        .unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert_eq!(done.commits, vec!["abc123".to_string()]);

    let plan = store.load_plan().unwrap();
    assert_eq!(plan.task_count, 1);
    assert_eq!(plan.completed_count, 1);
}

#[test]
fn start_requires_todo_and_met_dependencies() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.create_task("two", "spec", vec!["task-1".into()]).unwrap();

    match store.start_task("task-2", None).unwrap_err() {
        CrewError::UnmetDependencies { missing, .. } => {
            assert_eq!(missing, vec!["task-1".to_string()]);
        }
        other => panic!("expected UnmetDependencies, got {other:?}"),
    }

    store.start_task("task-1", None).unwrap();
    assert!(matches!(
        store.start_task("task-1", None),
        Err(CrewError::InvalidStatus { .. })
    ));

    store.complete_task("task-1", None, CompletionEvidence::default()).unwrap();
    store.start_task("task-2", None).unwrap();
}

#[test]
fn attempts_accumulate_across_retries() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();

    store.start_task("task-1", None).unwrap();
    store.reset_task("task-1", false).unwrap();
    let again = store.start_task("task-1", None).unwrap();
    assert_eq!(again.attempts, 2);
}

#[test]
fn block_and_unblock() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.start_task("task-1", None).unwrap();

    let blocked = store.block_task("task-1", "missing credentials").unwrap();
    assert_eq!(blocked.status, TaskStatus::Blocked);
    assert_eq!(blocked.blocked_reason.as_deref(), Some("missing credentials"));
    let note = std::fs::read_to_string(store.paths().block_md("task-1")).unwrap();
    assert_eq!(note, "missing credentials");

    let unblocked = store.unblock_task("task-1").unwrap();
    assert_eq!(unblocked.status, TaskStatus::Todo);
    assert!(unblocked.blocked_reason.is_none());
    assert!(!store.paths().block_md("task-1").exists());
}

#[test]
fn block_requires_in_progress() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    assert!(matches!(
        store.block_task("task-1", "nope"),
        Err(CrewError::InvalidStatus { .. })
    ));
}

#[test]
fn reset_cascades_to_dependents() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.create_task("two", "spec", vec!["task-1".into()]).unwrap();
    store.create_task("three", "spec", vec!["task-2".into()]).unwrap();

    store.start_task("task-1", None).unwrap();
    store.complete_task("task-1", None, CompletionEvidence::default()).unwrap();
    store.start_task("task-2", None).unwrap();
    store.complete_task("task-2", None, CompletionEvidence::default()).unwrap();
    store.start_task("task-3", None).unwrap();

    let reset = store.reset_task("task-1", true).unwrap();
    assert_eq!(reset.len(), 3);
    for id in ["task-1", "task-2", "task-3"] {
        assert_eq!(store.load_task(id).unwrap().status, TaskStatus::Todo);
    }
    let plan = store.load_plan().unwrap();
    assert_eq!(plan.completed_count, 0);
}

#[test]
fn reset_without_cascade_leaves_dependents() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.create_task("two", "spec", vec!["task-1".into()]).unwrap();
    store.start_task("task-1", None).unwrap();
    store.complete_task("task-1", None, CompletionEvidence::default()).unwrap();
    store.start_task("task-2", None).unwrap();

    store.reset_task("task-1", false).unwrap();
    assert_eq!(store.load_task("task-2").unwrap().status, TaskStatus::InProgress);
}

#[test]
fn ready_respects_dependency_order() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.create_task("two", "spec", vec!["task-1".into()]).unwrap();
    store.create_task("three", "spec", vec!["task-1".into()]).unwrap();

    let ready: Vec<String> = store.ready().into_iter().map(|t| t.id).collect();
    assert_eq!(ready, vec!["task-1".to_string()]);

    store.start_task("task-1", None).unwrap();
    store.complete_task("task-1", None, CompletionEvidence::default()).unwrap();
    let ready: Vec<String> = store.ready().into_iter().map(|t| t.id).collect();
    assert_eq!(ready, vec!["task-2".to_string(), "task-3".to_string()]);
}

#[test]
fn spec_append_never_replaces() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "original spec", vec![]).unwrap();
    store.append_task_spec("task-1", "## Amendment\nnew requirement").unwrap();

    let spec = store.task_spec("task-1").unwrap();
    assert!(spec.starts_with("original spec"));
    assert!(spec.contains("## Amendment"));
}

#[test]
fn validate_resyncs_counters() {
    let dir = TempDir::new().unwrap();
    let store = planned(&dir);
    store.create_task("one", "spec", vec![]).unwrap();
    store.start_task("task-1", None).unwrap();
    store.complete_task("task-1", None, CompletionEvidence::default()).unwrap();

    // Corrupt the counters behind the store's back.
    let mut plan = store.load_plan().unwrap();
    plan.task_count = 9;
    plan.completed_count = 0;
    pim_storage::write_json_atomic(&store.paths().plan_json(), &plan).unwrap();

    let report = store.validate().unwrap();
    assert!(report.counters_fixed);
    let plan = store.load_plan().unwrap();
    assert_eq!(plan.task_count, 1);
    assert_eq!(plan.completed_count, 1);
}
