// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spawner::{AgentRole, AgentRun};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Spawner that tracks how many children run at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait::async_trait]
impl Spawner for Gauge {
    fn has_agent(&self, _agent: &str) -> bool {
        true
    }

    async fn run(&self, request: SpawnRequest) -> Result<AgentRun, SpawnError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(AgentRun {
            agent: request.agent.clone(),
            idx: request.idx,
            output: format!("done {}", request.idx),
            truncated: false,
            tokens: 0,
            elapsed_ms: 20,
            exit_code: Some(0),
        })
    }
}

fn requests(n: usize) -> Vec<SpawnRequest> {
    (0..n)
        .map(|idx| SpawnRequest {
            agent: "worker".into(),
            idx,
            role: AgentRole::Worker,
            prompt: String::new(),
            cwd: std::env::temp_dir(),
            max_output: None,
            artifacts: crate::spawner::ArtifactSink::disabled(),
        })
        .collect()
}

#[tokio::test]
async fn concurrency_is_capped() {
    let gauge = Arc::new(Gauge::default());
    let slots = run_wave(Arc::clone(&gauge) as Arc<dyn Spawner>, requests(8), 2, |_| {}).await;
    assert_eq!(slots.len(), 8);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2, "peak {}", gauge.peak.load(Ordering::SeqCst));
}

#[tokio::test]
async fn all_results_arrive_and_stream() {
    let gauge = Arc::new(Gauge::default());
    let streamed = Arc::new(Mutex::new(Vec::new()));
    let streamed_in = Arc::clone(&streamed);
    let slots = run_wave(gauge as Arc<dyn Spawner>, requests(5), 3, move |slot| {
        streamed_in.lock().push(slot.request.idx);
    })
    .await;

    assert_eq!(slots.len(), 5);
    assert_eq!(streamed.lock().len(), 5);
    let mut indices: Vec<usize> = slots.iter().map(|s| s.request.idx).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn zero_limit_still_runs_serially() {
    let gauge = Arc::new(Gauge::default());
    let slots = run_wave(Arc::clone(&gauge) as Arc<dyn Spawner>, requests(3), 0, |_| {}).await;
    assert_eq!(slots.len(), 3);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}
