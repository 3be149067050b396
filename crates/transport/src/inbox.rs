// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox consumption: directory watcher, debounce, dead-letter, polling
//! fallback.
//!
//! One scan lists the sorted message files and read-parse-deliver-deletes
//! each. Scans are re-entrancy guarded: a scan requested while one is
//! running defers and the running scan re-runs when it finishes, so no
//! event is dropped and no two scans interleave.
//!
//! If the platform watcher fails to start or keeps erroring after
//! [`MAX_WATCHER_RETRIES`] exponential backoffs, the transport falls back
//! to polling for the rest of the session.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use pim_core::InboxMessage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Settle window after a filesystem event before scanning.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// Polling cadence once the watcher has been given up on.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1_500);

/// Watcher (re)start attempts before permanent polling.
pub const MAX_WATCHER_RETRIES: u32 = 5;

/// Cap on the exponential watcher-retry backoff.
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Receives each delivered message exactly once per scan.
///
/// Deliver-then-crash may re-deliver after restart; implementations must
/// be idempotent on `message.id`.
pub trait MessageHandler: Send + Sync {
    fn deliver(&self, message: InboxMessage);
}

struct ScanState {
    running: bool,
    pending: bool,
}

/// Shared scan logic, callable from the watcher task and synchronously
/// (e.g. draining before a rename).
struct Scanner {
    inbox: PathBuf,
    deadletter: PathBuf,
    handler: Arc<dyn MessageHandler>,
    state: Mutex<ScanState>,
}

impl Scanner {
    /// Run a scan, or defer if one is already running (the runner picks
    /// the deferred request up before finishing).
    fn scan(&self) {
        {
            let mut state = self.state.lock();
            if state.running {
                state.pending = true;
                return;
            }
            state.running = true;
        }
        loop {
            self.scan_once();
            let mut state = self.state.lock();
            if state.pending {
                state.pending = false;
                // Loop again with the lock released.
            } else {
                state.running = false;
                return;
            }
        }
    }

    fn scan_once(&self) {
        let Ok(entries) = fs::read_dir(&self.inbox) else {
            return;
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
            .collect();
        files.sort();

        for path in files {
            match fs::read(&path).ok().and_then(|b| serde_json::from_slice::<InboxMessage>(&b).ok())
            {
                Some(message) => {
                    self.handler.deliver(message);
                    let _ = fs::remove_file(&path);
                }
                None => self.quarantine(&path),
            }
        }
    }

    /// Move an undeliverable file to `.deadletter/<orig>.bad-<ts>`.
    fn quarantine(&self, path: &Path) {
        let _ = fs::create_dir_all(&self.deadletter);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "message".to_string());
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = self.deadletter.join(format!("{name}.bad-{ts}"));
        tracing::warn!(from = %path.display(), to = %target.display(), "dead-lettering message");
        if fs::rename(path, &target).is_err() {
            // Last resort so the scan loop cannot spin on the same file.
            let _ = fs::remove_file(path);
        }
    }
}

/// Owns the background consumption of one session's inbox.
pub struct InboxWatcher {
    scanner: Arc<Scanner>,
    shutdown: CancellationToken,
}

impl InboxWatcher {
    /// Start watching `inbox`. The directory is created if missing; an
    /// initial scan drains anything that arrived before startup.
    pub fn start(
        inbox: PathBuf,
        deadletter: PathBuf,
        handler: Arc<dyn MessageHandler>,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(&inbox)?;
        let scanner = Arc::new(Scanner {
            inbox: inbox.clone(),
            deadletter,
            handler,
            state: Mutex::new(ScanState { running: false, pending: false }),
        });
        let shutdown = CancellationToken::new();

        tokio::spawn(run(inbox, Arc::clone(&scanner), shutdown.clone()));
        Ok(Self { scanner, shutdown })
    }

    /// Synchronously drain the inbox now (used before renames and on
    /// explicit flush).
    pub fn drain_now(&self) {
        self.scanner.scan();
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for InboxWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn scan_off_reactor(scanner: Arc<Scanner>) {
    // Scans touch the filesystem and call the handler; keep them off the
    // async reactor.
    let _ = tokio::task::spawn_blocking(move || scanner.scan()).await;
}

/// Background loop: initial drain, then event-driven scans with debounce.
/// Watcher start failures and errors retry with exponential backoff; once
/// the budget is spent the loop degrades to polling permanently.
async fn run(inbox: PathBuf, scanner: Arc<Scanner>, shutdown: CancellationToken) {
    scan_off_reactor(Arc::clone(&scanner)).await;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
    let mut retries = 0u32;

    let mut watcher = loop {
        match start_watcher(&inbox, event_tx.clone()) {
            Ok(watcher) => break Some(watcher),
            Err(err) => {
                retries += 1;
                tracing::warn!(%err, retries, "inbox watcher failed to start");
                if retries >= MAX_WATCHER_RETRIES {
                    break None;
                }
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(backoff_delay(retries)) => {}
                }
            }
        }
    };
    if watcher.is_none() {
        tracing::warn!("watcher exhausted, falling back to polling");
    }

    loop {
        if watcher.is_some() {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                received = event_rx.recv() => match received {
                    Some(Ok(_event)) => {
                        tokio::time::sleep(DEBOUNCE).await;
                        // Collapse the burst: one scan handles every file
                        // regardless of how many events queued.
                        while event_rx.try_recv().is_ok() {}
                        scan_off_reactor(Arc::clone(&scanner)).await;
                    }
                    Some(Err(err)) => {
                        retries += 1;
                        tracing::warn!(%err, retries, "inbox watcher error");
                        if retries >= MAX_WATCHER_RETRIES {
                            tracing::warn!("watcher exhausted, falling back to polling");
                            watcher = None;
                            continue;
                        }
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = tokio::time::sleep(backoff_delay(retries)) => {}
                        }
                        watcher = start_watcher(&inbox, event_tx.clone()).ok();
                    }
                    None => {
                        watcher = None;
                    }
                },
            }
        } else {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    scan_off_reactor(Arc::clone(&scanner)).await;
                }
            }
        }
    }
}

fn start_watcher(
    inbox: &Path,
    tx: mpsc::UnboundedSender<notify::Result<notify::Event>>,
) -> notify::Result<RecommendedWatcher> {
    let forward = move |res: notify::Result<notify::Event>| {
        let _ = tx.send(res);
    };
    let mut watcher = notify::recommended_watcher(forward)?;
    watcher.watch(inbox, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn backoff_delay(retries: u32) -> Duration {
    let base = Duration::from_millis(500);
    let factor = 2u32.saturating_pow(retries.min(8));
    (base * factor).min(BACKOFF_CAP)
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
