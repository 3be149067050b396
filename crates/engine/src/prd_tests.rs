// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn explicit_path_wins() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("PRD.md"), "default").unwrap();
    std::fs::write(dir.path().join("custom.md"), "explicit").unwrap();

    let doc = discover_prd(dir.path(), Some("custom.md")).unwrap();
    assert_eq!(doc.rel_path, "custom.md");
    assert_eq!(doc.content, "explicit");
}

#[test]
fn explicit_missing_is_no_prd() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        discover_prd(dir.path(), Some("absent.md")),
        Err(CrewError::NoPrd)
    ));
}

#[test]
fn fixed_candidate_order() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("SPEC.md"), "spec").unwrap();
    std::fs::write(dir.path().join("PLAN.md"), "plan").unwrap();

    let doc = discover_prd(dir.path(), None).unwrap();
    assert_eq!(doc.rel_path, "SPEC.md");
}

#[test]
fn docs_dir_is_searched_after_root() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("PRD.md"), "docs prd").unwrap();

    let doc = discover_prd(dir.path(), None).unwrap();
    assert_eq!(doc.rel_path, "docs/PRD.md");
}

#[test]
fn no_candidates_is_no_prd() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(discover_prd(dir.path(), None), Err(CrewError::NoPrd)));
}

#[test]
fn oversized_prd_is_truncated_with_marker() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("PRD.md"), "x".repeat(MAX_PRD_BYTES + 100)).unwrap();

    let doc = discover_prd(dir.path(), None).unwrap();
    assert!(doc.truncated);
    assert!(doc.content.contains("[PRD truncated"));
    assert!(doc.content.len() < MAX_PRD_BYTES + 200);
}
