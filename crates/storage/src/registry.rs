// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry: one JSON file per live agent.
//!
//! A registration is exclusively owned by the process whose PID it
//! records. Readers prune entries whose PID is dead. The active-agent
//! scan is on the hot path (every keystroke and write enforcement), so
//! results are cached for one second and the cache is invalidated on any
//! local mutation.

use crate::fsio::{read_json, write_json_atomic, StoreError};
use crate::paths::MessengerPaths;
use crate::proc::pid_alive;
use parking_lot::Mutex;
use pim_core::{validate_name, Clock, NameError, Registration};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a scan result stays fresh.
const CACHE_TTL: Duration = Duration::from_millis(1_000);

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("name {0} is taken by a live agent")]
    NameTaken(String),
    #[error("lost registration race for {name} to pid {winner}")]
    RaceLost { name: String, winner: u32 },
    #[error("registration for {0} disappeared during verification")]
    Vanished(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct CachedScan {
    taken_at: u64,
    exclude: Option<String>,
    scope: Option<PathBuf>,
    agents: Vec<Registration>,
}

/// Registry accessor bound to one base directory.
pub struct RegistryStore<C: Clock> {
    paths: MessengerPaths,
    clock: C,
    cache: Mutex<Option<CachedScan>>,
}

impl<C: Clock> RegistryStore<C> {
    pub fn new(paths: MessengerPaths, clock: C) -> Self {
        Self { paths, clock, cache: Mutex::new(None) }
    }

    pub fn paths(&self) -> &MessengerPaths {
        &self.paths
    }

    /// Write a registration and verify ownership by reading it back.
    ///
    /// If the file shows a foreign PID after the write, another process
    /// won the race for this name; the file is left alone.
    pub fn register(&self, reg: &Registration) -> Result<(), RegistryError> {
        validate_name(&reg.name)?;
        if let Some(existing) = self.load(&reg.name) {
            let same_owner =
                existing.pid == reg.pid && existing.session_id == reg.session_id;
            if !same_owner && pid_alive(existing.pid) {
                return Err(RegistryError::NameTaken(reg.name.clone()));
            }
        }
        write_json_atomic(&self.paths.registration_file(&reg.name), reg)?;
        match self.load(&reg.name) {
            Some(written) if written.pid == reg.pid && written.session_id == reg.session_id => {
                self.invalidate();
                Ok(())
            }
            Some(written) => {
                Err(RegistryError::RaceLost { name: reg.name.clone(), winner: written.pid })
            }
            None => Err(RegistryError::Vanished(reg.name.clone())),
        }
    }

    /// Remove own registration and inbox on clean shutdown.
    pub fn deregister(&self, name: &str, session_id: &str) {
        let _ = fs::remove_file(self.paths.registration_file(name));
        let _ = fs::remove_dir_all(self.paths.inbox_dir(session_id));
        self.invalidate();
    }

    pub fn load(&self, name: &str) -> Option<Registration> {
        read_json(&self.paths.registration_file(name))
    }

    /// Read-modify-write own registration.
    pub fn update(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut Registration),
    ) -> Result<(), RegistryError> {
        let mut reg = self.load(name).ok_or_else(|| RegistryError::Vanished(name.to_string()))?;
        mutate(&mut reg);
        write_json_atomic(&self.paths.registration_file(name), &reg)?;
        self.invalidate();
        Ok(())
    }

    /// Move a registration to a new name, preserving the session id (and
    /// with it the inbox directory). The caller drains pending messages
    /// first so nothing is processed under the old name.
    pub fn rename(&self, old: &str, new: &str) -> Result<Registration, RegistryError> {
        validate_name(new)?;
        let mut reg =
            self.load(old).ok_or_else(|| RegistryError::Vanished(old.to_string()))?;
        if let Some(existing) = self.load(new) {
            if pid_alive(existing.pid) {
                return Err(RegistryError::NameTaken(new.to_string()));
            }
        }
        reg.name = new.to_string();
        self.register(&reg)?;
        let _ = fs::remove_file(self.paths.registration_file(old));
        self.invalidate();
        Ok(reg)
    }

    /// All live registrations, excluding `exclude`, optionally scoped to
    /// agents sharing `scope` as cwd. Dead-PID entries are deleted as a
    /// side effect. Cached for one second per (exclude, scope) key.
    pub fn active_agents(
        &self,
        exclude: Option<&str>,
        scope: Option<&Path>,
    ) -> Vec<Registration> {
        let now = self.clock.epoch_ms();
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.as_ref() {
                let fresh = now.saturating_sub(cached.taken_at) < CACHE_TTL.as_millis() as u64;
                if fresh
                    && cached.exclude.as_deref() == exclude
                    && cached.scope.as_deref() == scope
                {
                    return cached.agents.clone();
                }
            }
        }

        let agents = self.scan(exclude, scope);
        *self.cache.lock() = Some(CachedScan {
            taken_at: now,
            exclude: exclude.map(str::to_string),
            scope: scope.map(Path::to_path_buf),
            agents: agents.clone(),
        });
        agents
    }

    fn scan(&self, exclude: Option<&str>, scope: Option<&Path>) -> Vec<Registration> {
        let dir = self.paths.registry_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut agents = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some(reg) = read_json::<Registration>(&path) else {
                continue;
            };
            if !pid_alive(reg.pid) {
                tracing::debug!(name = %reg.name, pid = reg.pid, "removing dead registration");
                let _ = fs::remove_file(&path);
                continue;
            }
            if exclude.is_some_and(|skip| skip == reg.name) {
                continue;
            }
            if scope.is_some_and(|cwd| cwd != reg.cwd) {
                continue;
            }
            agents.push(reg);
        }
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    /// Drop the scan cache; call after any local registration mutation.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
