// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PRD discovery.
//!
//! Candidates are checked in a fixed order at the project root and under
//! `docs/`. Duplicates are collapsed by canonical path so case-insensitive
//! filesystems do not yield the same file twice. Content is capped at
//! 100 KB with a truncation marker.

use crate::crew_store::CrewError;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed-order discovery candidates.
pub const PRD_CANDIDATES: &[&str] = &["PRD.md", "SPEC.md", "REQUIREMENTS.md", "DESIGN.md", "PLAN.md"];

/// Cap on PRD content fed into planner prompts.
pub const MAX_PRD_BYTES: usize = 100 * 1024;

/// A discovered PRD with its project-relative path.
#[derive(Debug, Clone)]
pub struct PrdDoc {
    pub rel_path: String,
    pub content: String,
    pub truncated: bool,
}

/// Find the PRD: an explicit path wins, else the first candidate found.
pub fn discover_prd(cwd: &Path, explicit: Option<&str>) -> Result<PrdDoc, CrewError> {
    if let Some(path) = explicit {
        let full = cwd.join(path);
        return read_prd(cwd, &full).ok_or(CrewError::NoPrd);
    }

    let mut seen: Vec<PathBuf> = Vec::new();
    for dir in [cwd.to_path_buf(), cwd.join("docs")] {
        for candidate in PRD_CANDIDATES {
            let full = dir.join(candidate);
            let Ok(canonical) = fs::canonicalize(&full) else {
                continue;
            };
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical);
            if let Some(doc) = read_prd(cwd, &full) {
                return Ok(doc);
            }
        }
    }
    Err(CrewError::NoPrd)
}

fn read_prd(cwd: &Path, full: &Path) -> Option<PrdDoc> {
    let content = fs::read_to_string(full).ok()?;
    let rel_path = full
        .strip_prefix(cwd)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| full.to_string_lossy().into_owned());
    let truncated = content.len() > MAX_PRD_BYTES;
    let content = if truncated {
        let mut cut = MAX_PRD_BYTES;
        while cut > 0 && !content.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}\n\n[PRD truncated at {MAX_PRD_BYTES} bytes]", &content[..cut])
    } else {
        content
    };
    Some(PrdDoc { rel_path, content, truncated })
}

#[cfg(test)]
#[path = "prd_tests.rs"]
mod tests;
