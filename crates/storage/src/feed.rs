// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity feed log: append-only JSONL with bounded retention.

use crate::fsio::StoreError;
use pim_core::{FeedEvent, DEFAULT_FEED_RETENTION};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct FeedLog {
    path: PathBuf,
    retention: usize,
}

impl FeedLog {
    pub fn new(path: PathBuf, retention: usize) -> Self {
        Self { path, retention }
    }

    pub fn with_default_retention(path: PathBuf) -> Self {
        Self::new(path, DEFAULT_FEED_RETENTION)
    }

    /// Append one event, trimming the log back to the retention bound
    /// when it overflows.
    pub fn append(&self, event: &FeedEvent) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        drop(file);

        self.trim()?;
        Ok(())
    }

    /// Last `limit` events, oldest first. Malformed lines are skipped.
    pub fn recent(&self, limit: usize) -> Vec<FeedEvent> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let events: Vec<FeedEvent> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = events.len().saturating_sub(limit);
        events.into_iter().skip(skip).collect()
    }

    fn trim(&self) -> Result<(), StoreError> {
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.retention {
            return Ok(());
        }
        let keep = &lines[lines.len() - self.retention..];
        crate::fsio::write_text_atomic(&self.path, &format!("{}\n", keep.join("\n")))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
