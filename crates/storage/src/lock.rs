// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive-create lock files.
//!
//! A lock is the existence of the file; the holder writes its PID as the
//! content. A contender may evict a lock whose mtime is past the stale
//! window and whose recorded PID is dead. Critical sections must stay
//! short and pure-filesystem — never hold one across child-process or
//! network I/O.

use crate::proc::pid_alive;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Swarm lock: short critical sections, aggressive retry.
pub const SWARM_LOCK_OPTIONS: LockOptions = LockOptions {
    stale_after: Duration::from_secs(10),
    retries: 50,
    retry_interval: Duration::from_millis(100),
};

/// Crew lock: guards multi-minute planning runs; contenders fail fast.
pub const CREW_LOCK_OPTIONS: LockOptions = LockOptions {
    stale_after: Duration::from_secs(600),
    retries: 0,
    retry_interval: Duration::from_millis(0),
};

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// A lock older than this is eligible for dead-PID eviction.
    pub stale_after: Duration,
    /// Acquisition attempts after the first.
    pub retries: u32,
    pub retry_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock {} held by pid {holder:?}", path.display())]
    Held { path: PathBuf, holder: Option<u32> },
    #[error("timed out acquiring lock {}", path.display())]
    Timeout { path: PathBuf },
    #[error("io error on lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A held lock; released on drop.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    /// Acquire `path`, retrying per `options`. With zero retries the
    /// failure is [`LockError::Held`] carrying the holder PID; with
    /// retries exhausted it is [`LockError::Timeout`].
    pub fn acquire(path: &Path, options: LockOptions) -> Result<Self, LockError> {
        let mut attempt = 0;
        loop {
            match try_create(path) {
                Ok(()) => return Ok(Self { path: path.to_path_buf() }),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if evict_if_stale(path, options.stale_after) {
                        continue;
                    }
                    if attempt >= options.retries {
                        if options.retries == 0 {
                            return Err(LockError::Held {
                                path: path.to_path_buf(),
                                holder: holder_pid(path),
                            });
                        }
                        return Err(LockError::Timeout { path: path.to_path_buf() });
                    }
                    attempt += 1;
                    std::thread::sleep(options.retry_interval);
                }
                Err(source) => {
                    return Err(LockError::Io { path: path.to_path_buf(), source })
                }
            }
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;
    write!(file, "{}", std::process::id())?;
    Ok(())
}

/// PID recorded in the lock file, if readable.
pub fn holder_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Remove the lock if it is past the stale window and its holder is dead.
/// Returns true if an eviction happened.
fn evict_if_stale(path: &Path, stale_after: Duration) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        // Vanished between attempts; retry immediately.
        return true;
    };
    let age = meta
        .modified()
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
        .unwrap_or_default();
    if age < stale_after {
        return false;
    }
    if let Some(pid) = holder_pid(path) {
        if pid_alive(pid) {
            return false;
        }
    }
    tracing::warn!(path = %path.display(), "evicting stale lock");
    fs::remove_file(path).is_ok()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
