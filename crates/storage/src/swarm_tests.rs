// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::{FakeClock, Registration};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    paths: MessengerPaths,
    registry: RegistryStore<FakeClock>,
    clock: FakeClock,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = MessengerPaths::at(dir.path());
        let clock = FakeClock::new();
        let registry = RegistryStore::new(paths.clone(), clock.clone());
        Self { _dir: dir, paths, registry, clock }
    }

    fn swarm(&self) -> SwarmStore<'_, FakeClock> {
        SwarmStore::new(&self.paths, &self.registry, self.clock.clone())
    }

    /// Register a live agent and return a matching claim template.
    fn join(&self, name: &str) -> Claim {
        let session_id = format!("sess-{name}");
        let mut reg: Registration =
            Registration::builder().name(name).session_id(session_id.clone()).build();
        reg.pid = std::process::id();
        self.registry.register(&reg).unwrap();
        Claim {
            agent: name.to_string(),
            session_id,
            pid: std::process::id(),
            claimed_at: self.clock.epoch_ms(),
            reason: None,
        }
    }
}

const SPEC: &str = "/specs/feature.md";

#[test]
fn claim_contention_sequence() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let b = fx.join("B");
    let swarm = fx.swarm();

    swarm.claim(SPEC, "TASK-1", &a).unwrap();

    // B cannot take A's slot.
    match swarm.claim(SPEC, "TASK-1", &b).unwrap_err() {
        SwarmError::AlreadyClaimed { claim, .. } => assert_eq!(claim.agent, "A"),
        other => panic!("expected AlreadyClaimed, got {other:?}"),
    }

    // B claims a different task, then hits the one-claim-per-agent wall.
    swarm.claim(SPEC, "TASK-2", &b).unwrap();
    match swarm.claim(SPEC, "TASK-3", &b).unwrap_err() {
        SwarmError::AlreadyHaveClaim { task_id, .. } => assert_eq!(task_id, "TASK-2"),
        other => panic!("expected AlreadyHaveClaim, got {other:?}"),
    }

    // A completes and is free to claim again.
    let done = swarm.complete(SPEC, "TASK-1", "A", Some("done".into())).unwrap();
    assert_eq!(done.completed_by, "A");
    swarm.claim(SPEC, "TASK-3", &a).unwrap();
}

#[test]
fn single_claim_invariant_spans_specs() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let swarm = fx.swarm();
    swarm.claim("/specs/one.md", "T1", &a).unwrap();
    assert!(matches!(
        swarm.claim("/specs/two.md", "T9", &a),
        Err(SwarmError::AlreadyHaveClaim { .. })
    ));
}

#[test]
fn completion_is_terminal() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let b = fx.join("B");
    let swarm = fx.swarm();
    swarm.claim(SPEC, "TASK-1", &a).unwrap();
    swarm.complete(SPEC, "TASK-1", "A", None).unwrap();

    assert!(matches!(
        swarm.claim(SPEC, "TASK-1", &b),
        Err(SwarmError::AlreadyCompleted { .. })
    ));
}

#[test]
fn complete_requires_claimant() {
    let fx = Fixture::new();
    let a = fx.join("A");
    fx.join("B");
    let swarm = fx.swarm();
    swarm.claim(SPEC, "TASK-1", &a).unwrap();

    assert!(matches!(
        swarm.complete(SPEC, "TASK-1", "B", None),
        Err(SwarmError::NotYourClaim { .. })
    ));
    assert!(matches!(
        swarm.complete(SPEC, "TASK-9", "A", None),
        Err(SwarmError::NotClaimed { .. })
    ));
}

#[test]
fn unclaim_verifies_holder() {
    let fx = Fixture::new();
    let a = fx.join("A");
    fx.join("B");
    let swarm = fx.swarm();
    swarm.claim(SPEC, "TASK-1", &a).unwrap();

    assert!(matches!(
        swarm.unclaim(SPEC, "TASK-1", "B"),
        Err(SwarmError::NotYourClaim { .. })
    ));
    swarm.unclaim(SPEC, "TASK-1", "A").unwrap();
    assert!(matches!(
        swarm.unclaim(SPEC, "TASK-1", "A"),
        Err(SwarmError::NotClaimed { .. })
    ));
}

#[test]
fn dead_claimant_is_collected_on_view_and_slot_freed() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let b = fx.join("B");
    let swarm = fx.swarm();

    // A claims, then "dies": its registration goes away.
    swarm.claim(SPEC, "TASK-1", &a).unwrap();
    fx.registry.deregister("A", "sess-A");

    let view = swarm.view().unwrap();
    assert!(view.claims.is_empty(), "stale claim filtered: {:?}", view.claims);

    swarm.claim(SPEC, "TASK-1", &b).unwrap();
}

#[test]
fn session_mismatch_is_stale() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let swarm = fx.swarm();
    swarm.claim(SPEC, "TASK-1", &a).unwrap();

    // The name was recycled by a new session with the same PID.
    fx.registry
        .update("A", |reg| reg.session_id = "sess-new".into())
        .unwrap();

    let view = swarm.view().unwrap();
    assert!(view.claims.is_empty());
}

#[test]
fn completions_survive_claimant_death() {
    let fx = Fixture::new();
    let a = fx.join("A");
    let swarm = fx.swarm();
    swarm.claim(SPEC, "TASK-1", &a).unwrap();
    swarm.complete(SPEC, "TASK-1", "A", Some("shipped".into())).unwrap();
    fx.registry.deregister("A", "sess-A");

    let view = swarm.view().unwrap();
    let done = view.completions.get(SPEC).and_then(|t| t.get("TASK-1")).unwrap();
    assert_eq!(done.notes.as_deref(), Some("shipped"));
}
