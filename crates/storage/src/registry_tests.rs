// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::FakeClock;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn store(dir: &TempDir) -> (RegistryStore<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (RegistryStore::new(MessengerPaths::at(dir.path()), clock.clone()), clock)
}

fn live_reg(name: &str) -> Registration {
    Registration::builder().name(name).pid(std::process::id()).build()
}

#[test]
fn register_and_load() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("Wren")).unwrap();
    assert_eq!(store.load("Wren").unwrap().name, "Wren");
}

#[test]
fn register_rejects_invalid_name() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    let err = store.register(&live_reg("bad name")).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidName(_)));
}

#[test]
fn register_rejects_live_duplicate() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("Wren")).unwrap();

    let mut other = live_reg("Wren");
    other.pid = std::process::id() + 1_000_000; // different pid, "other" process
    let err = store.register(&other).unwrap_err();
    assert!(matches!(err, RegistryError::NameTaken(_)));
}

#[test]
fn register_replaces_dead_holder() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    let mut dead = live_reg("Wren");
    dead.pid = 999_999_999;
    write_json_atomic(&store.paths().registration_file("Wren"), &dead).unwrap();

    store.register(&live_reg("Wren")).unwrap();
    assert_eq!(store.load("Wren").unwrap().pid, std::process::id());
}

#[test]
fn active_agents_prunes_dead_entries() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("Alive")).unwrap();
    let mut dead = live_reg("Dead");
    dead.pid = 999_999_999;
    write_json_atomic(&store.paths().registration_file("Dead"), &dead).unwrap();

    let names: Vec<String> =
        store.active_agents(None, None).into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Alive".to_string()]);
    assert!(!store.paths().registration_file("Dead").exists(), "dead entry deleted");
}

#[test]
fn active_agents_excludes_self_and_scopes_to_cwd() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    let mut here = live_reg("Here");
    here.cwd = "/work/a".into();
    let mut there = live_reg("There");
    there.cwd = "/work/b".into();
    store.register(&here).unwrap();
    store.register(&there).unwrap();

    let names: Vec<String> = store
        .active_agents(Some("There"), None)
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Here".to_string()]);

    let scoped: Vec<String> = store
        .active_agents(None, Some(Path::new("/work/b")))
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(scoped, vec!["There".to_string()]);
}

#[test]
fn scan_cache_hits_within_ttl_and_invalidates_on_mutation() {
    let dir = TempDir::new().unwrap();
    let (store, clock) = store(&dir);
    store.register(&live_reg("One")).unwrap();

    assert_eq!(store.active_agents(None, None).len(), 1);

    // A registration written behind the cache's back is not seen...
    write_json_atomic(&store.paths().registration_file("Two"), &live_reg("Two")).unwrap();
    assert_eq!(store.active_agents(None, None).len(), 1, "cached result");

    // ...until the TTL lapses...
    clock.advance(StdDuration::from_millis(1_100));
    assert_eq!(store.active_agents(None, None).len(), 2);

    // ...or a local mutation invalidates.
    write_json_atomic(&store.paths().registration_file("Three"), &live_reg("Three")).unwrap();
    assert_eq!(store.active_agents(None, None).len(), 2, "cached again");
    store.register(&live_reg("Four")).unwrap();
    assert_eq!(store.active_agents(None, None).len(), 4);
}

#[test]
fn cache_key_includes_exclusion() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("A")).unwrap();
    store.register(&live_reg("B")).unwrap();

    assert_eq!(store.active_agents(Some("A"), None).len(), 1);
    // Different key must not serve the filtered result.
    assert_eq!(store.active_agents(None, None).len(), 2);
}

#[test]
fn update_mutates_and_invalidates() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("Wren")).unwrap();
    store
        .update("Wren", |reg| {
            reg.status_message = Some("refactoring".into());
            reg.stats.tool_calls += 1;
        })
        .unwrap();
    let reg = store.load("Wren").unwrap();
    assert_eq!(reg.status_message.as_deref(), Some("refactoring"));
    assert_eq!(reg.stats.tool_calls, 1);
}

#[test]
fn rename_preserves_session_id_and_removes_old_file() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    let mut reg = live_reg("OldName");
    reg.session_id = "sess-keep".into();
    store.register(&reg).unwrap();

    let renamed = store.rename("OldName", "NewName").unwrap();
    assert_eq!(renamed.session_id, "sess-keep");
    assert!(store.load("OldName").is_none());
    assert_eq!(store.load("NewName").unwrap().session_id, "sess-keep");
}

#[test]
fn rename_to_live_name_fails() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    store.register(&live_reg("A")).unwrap();
    store.register(&live_reg("B")).unwrap();
    assert!(matches!(store.rename("A", "B"), Err(RegistryError::NameTaken(_))));
}

#[test]
fn deregister_removes_registration_and_inbox() {
    let dir = TempDir::new().unwrap();
    let (store, _) = store(&dir);
    let mut reg = live_reg("Wren");
    reg.session_id = "sess-1".into();
    store.register(&reg).unwrap();
    let inbox = store.paths().inbox_dir("sess-1");
    std::fs::create_dir_all(&inbox).unwrap();

    store.deregister("Wren", "sess-1");
    assert!(store.load("Wren").is_none());
    assert!(!inbox.exists());
}
