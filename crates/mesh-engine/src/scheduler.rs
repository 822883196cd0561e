// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic scheduler: deadline-driven selection, the lazy expiry sweep,
//! and beacon refresh.
//!
//! One tokio task per engine, cancelled through the shared token. A tick
//! never aborts the loop; the coordinator logs failures and the next tick
//! retries against the authoritative store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coordinator::Coordinator;

/// Floor on the tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 250;

/// Spawn the scheduler loop. Returns the task handle; cancel `token` to
/// stop it.
pub fn spawn_scheduler(
    coordinator: Arc<Coordinator>,
    interval_ms: u64,
    token: CancellationToken,
) -> JoinHandle<()> {
    let period = Duration::from_millis(interval_ms.max(MIN_TICK_INTERVAL_MS));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    coordinator.tick().await;
                }
            }
        }
    })
}
