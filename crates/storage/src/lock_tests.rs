// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn fast_options() -> LockOptions {
    LockOptions {
        stale_after: Duration::from_secs(10),
        retries: 2,
        retry_interval: Duration::from_millis(5),
    }
}

#[test]
fn acquire_writes_pid_and_release_removes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarm.lock");
    let lock = DirLock::acquire(&path, fast_options()).unwrap();
    assert_eq!(holder_pid(&path), Some(std::process::id()));
    drop(lock);
    assert!(!path.exists());
}

#[test]
fn second_acquire_times_out_while_held() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarm.lock");
    let _held = DirLock::acquire(&path, fast_options()).unwrap();
    let err = DirLock::acquire(&path, fast_options()).unwrap_err();
    assert!(matches!(err, LockError::Timeout { .. }));
}

#[test]
fn zero_retry_acquire_reports_holder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.lock");
    let _held = DirLock::acquire(&path, CREW_LOCK_OPTIONS).unwrap();
    let err = DirLock::acquire(&path, CREW_LOCK_OPTIONS).unwrap_err();
    match err {
        LockError::Held { holder, .. } => assert_eq!(holder, Some(std::process::id())),
        other => panic!("expected Held, got {other:?}"),
    }
}

#[test]
fn stale_dead_pid_lock_is_evicted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarm.lock");
    // A lock left behind by a dead process, with an old mtime.
    std::fs::write(&path, "999999999").unwrap();
    let old = std::time::SystemTime::now() - Duration::from_secs(60);
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(old).unwrap();
    drop(file);

    let lock = DirLock::acquire(&path, fast_options()).unwrap();
    assert_eq!(holder_pid(&path), Some(std::process::id()));
    drop(lock);
}

#[test]
fn fresh_foreign_lock_is_not_evicted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarm.lock");
    // Dead PID but fresh mtime: still within the stale window.
    std::fs::write(&path, "999999999").unwrap();
    let err = DirLock::acquire(&path, fast_options()).unwrap_err();
    assert!(matches!(err, LockError::Timeout { .. }));
    assert!(path.exists());
}

#[test]
fn live_pid_lock_is_not_evicted_even_when_old() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swarm.lock");
    std::fs::write(&path, format!("{}", std::process::id())).unwrap();
    let old = std::time::SystemTime::now() - Duration::from_secs(60);
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(old).unwrap();
    drop(file);

    let err = DirLock::acquire(&path, fast_options()).unwrap_err();
    assert!(matches!(err, LockError::Timeout { .. }));
}
