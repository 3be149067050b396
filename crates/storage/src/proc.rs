// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness probes.
//!
//! Presence in the mesh is ownership of a registry file by a live PID,
//! so every reader needs a cheap "is this process still there" check.

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// This process's PID.
pub fn current_pid() -> u32 {
    std::process::id()
}

/// Whether a process with `pid` exists (signal 0 probe).
///
/// EPERM counts as alive: the process exists, we just cannot signal it.
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
