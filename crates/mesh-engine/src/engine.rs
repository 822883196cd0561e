// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine lifecycle: backend selection, start, and graceful stop.
//!
//! [`Engine::start`] wires the configured store (SQLite runs its migrations
//! on open), the trust-gated reputation client, and the coordinator, then
//! spawns the ingest loop and the scheduler under one cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mesh_config::{MeshConfig, StorageConfig};
use mesh_core::{MeshError, Store, Transport};
use mesh_reputation::{HostAdapters, ReputationClient, TrustSettings};
use mesh_store::{MemoryStore, RestStore, SqliteStore};

use crate::coordinator::Coordinator;
use crate::scheduler::spawn_scheduler;

/// A running MESH engine.
pub struct Engine {
    coordinator: Arc<Coordinator>,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Validate the configuration, open the store, and start the engine
    /// tasks. `adapters` carries whatever chain plumbing the host injects.
    pub async fn start(
        config: MeshConfig,
        transport: Arc<dyn Transport>,
        adapters: HostAdapters,
    ) -> Result<Self, MeshError> {
        mesh_config::validate(&config)?;

        let store = build_store(&config.storage).await?;
        let trust = TrustSettings {
            strict_chain: config.chain.strict_chain(),
            allow_local_fallback: config.chain.allow_local_reputation_fallback,
        };
        let reputation = Arc::new(ReputationClient::new(trust, adapters));

        let auto_register = config.chain.auto_register_on_start;
        let skills = config.agent.skills.clone();
        let min_fee = config.agent.min_fee.clone();
        let stake = config.agent.stake.clone();
        let scheduler_enabled = config.engine.enable_scheduler;
        let scheduler_interval_ms = config.engine.scheduler_interval_ms;

        let coordinator = Arc::new(Coordinator::new(
            config,
            store,
            reputation,
            transport.clone(),
        ));

        if auto_register {
            coordinator.register(skills, min_fee, stake).await?;
        }

        let token = CancellationToken::new();
        let mut tasks = Vec::new();

        tasks.push(spawn_ingest_loop(
            coordinator.clone(),
            transport,
            token.clone(),
        ));
        if scheduler_enabled {
            tasks.push(spawn_scheduler(
                coordinator.clone(),
                scheduler_interval_ms,
                token.clone(),
            ));
        }

        info!(address = %coordinator.address(), "engine started");
        Ok(Self {
            coordinator,
            token,
            tasks,
        })
    }

    /// The coordinator, for the tool surface.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Cancel the engine tasks and wait for them to drain.
    pub async fn stop(self) {
        self.token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "engine task aborted");
            }
        }
        info!("engine stopped");
    }
}

/// Pick the store backend from configuration: SQLite path, REST pair, or
/// in-memory when neither is set.
async fn build_store(config: &StorageConfig) -> Result<Arc<dyn Store>, MeshError> {
    if let Some(path) = &config.database_path {
        let store = SqliteStore::open(path).await?;
        info!(path = %path, "using sqlite store");
        return Ok(Arc::new(store));
    }
    if let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_service_role_key) {
        let store = RestStore::new(url, key)?;
        info!(url = %url, "using rest store");
        return Ok(Arc::new(store));
    }
    info!("using in-memory store");
    Ok(Arc::new(MemoryStore::new()))
}

fn spawn_ingest_loop(
    coordinator: Arc<Coordinator>,
    transport: Arc<dyn Transport>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = transport.receive() => match event {
                    Ok(event) => {
                        if let Err(e) = coordinator.ingest(&event).await {
                            warn!(error = %e, "ingest failed");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "transport receive failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    })
}
