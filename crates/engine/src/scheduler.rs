// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency-capped child fan-out.
//!
//! Runs a wave of spawn requests with at most `limit` children alive,
//! yielding each result as it completes so progress can be streamed.

use crate::spawner::{AgentRun, SpawnError, SpawnRequest, Spawner};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One finished slot of a wave.
pub struct WaveSlot {
    pub request: SpawnRequest,
    pub result: Result<AgentRun, SpawnError>,
}

/// Run all requests with bounded parallelism; results arrive in
/// completion order. `on_complete` fires once per slot as it lands.
pub async fn run_wave(
    spawner: Arc<dyn Spawner>,
    requests: Vec<SpawnRequest>,
    limit: usize,
    mut on_complete: impl FnMut(&WaveSlot),
) -> Vec<WaveSlot> {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();

    for request in requests {
        let spawner = Arc::clone(&spawner);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            // The semaphore is never closed while the wave runs.
            let Ok(_permit) = semaphore.acquire().await else {
                return WaveSlot {
                    result: Err(SpawnError::Aborted { agent: request.agent.clone() }),
                    request,
                };
            };
            let result = spawner.run(request.clone()).await;
            WaveSlot { request, result }
        });
    }

    let mut slots = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(slot) => {
                on_complete(&slot);
                slots.push(slot);
            }
            Err(err) => tracing::warn!(%err, "wave task panicked"),
        }
    }
    slots
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
