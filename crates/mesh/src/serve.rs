// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `mesh serve` loop: configuration, transport, engine lifecycle, and
//! signal-driven shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mesh_core::MeshError;
use mesh_engine::Engine;
use mesh_reputation::HostAdapters;
use mesh_telegram::TelegramTransport;

/// Load the config, connect the transport, and run the engine until a
/// shutdown signal arrives.
pub async fn run(config_path: &str) -> Result<(), MeshError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = mesh_config::load_from_path(config_path)?;
    if config.agent.address.is_empty() {
        return Err(MeshError::Config("agent.address is required for serve".into()));
    }

    let transport = Arc::new(TelegramTransport::new(&config.transport)?);
    transport.connect().await;

    // The on-chain wrapper and payment verifier are injected by the host
    // process when available; the bare binary runs with the trust-gated
    // fallbacks.
    let engine = Engine::start(config, transport.clone(), HostAdapters::default()).await?;

    let shutdown = install_signal_handler();
    shutdown.cancelled().await;

    info!("shutting down");
    engine.stop().await;
    transport.disconnect().await;
    Ok(())
}

/// Installs handlers for SIGTERM and SIGINT (Ctrl+C).
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}
