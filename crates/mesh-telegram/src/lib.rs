// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for the MESH engine.
//!
//! Implements [`mesh_core::Transport`] over the Bot API via teloxide: long
//! polling feeds an internal channel that `receive()` drains, and `send()`
//! posts a single message (retry policy lives in the engine's facade).

pub mod handler;

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UpdateKind};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mesh_config::TransportConfig;
use mesh_core::{MeshError, Transport, TransportEvent};

/// Telegram group-chat transport.
pub struct TelegramTransport {
    bot: Bot,
    mesh_group_id: String,
    inbound_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    inbound_tx: mpsc::Sender<TransportEvent>,
    polling: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramTransport {
    /// Build the adapter. Requires `transport.bot_token` and
    /// `transport.mesh_group_id`.
    pub fn new(config: &TransportConfig) -> Result<Self, MeshError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            MeshError::Config("transport.bot_token is required for Telegram".into())
        })?;
        if token.is_empty() {
            return Err(MeshError::Config("transport.bot_token cannot be empty".into()));
        }
        if config.mesh_group_id.is_empty() {
            return Err(MeshError::Config("transport.mesh_group_id is required".into()));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        Ok(Self {
            bot: Bot::new(token),
            mesh_group_id: config.mesh_group_id.clone(),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            polling: Mutex::new(None),
        })
    }

    /// Start the long-polling loop feeding `receive()`.
    pub async fn connect(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut offset: i32 = 0;
            loop {
                let updates = match this.bot.get_updates().offset(offset).timeout(25).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        warn!(error = %e, "get_updates failed, backing off");
                        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = offset.max(update.id.0 as i32 + 1);
                    let UpdateKind::Message(msg) = update.kind else {
                        continue;
                    };
                    if !handler::is_mesh_group(&msg, &this.mesh_group_id) {
                        debug!(chat = msg.chat.id.0, "ignoring message outside the mesh group");
                        continue;
                    }
                    let Some(event) = handler::to_event(&msg) else {
                        continue;
                    };
                    if this.inbound_tx.send(event).await.is_err() {
                        info!("inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
        });
        *self.polling.lock().await = Some(handle);
        info!(group = %self.mesh_group_id, "telegram polling started");
    }

    /// Abort the polling loop.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.polling.lock().await.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, MeshError> {
        let id: i64 = chat_id.parse().map_err(|_| MeshError::Transport {
            message: format!("invalid chat id {chat_id}"),
            source: None,
        })?;
        let msg = self
            .bot
            .send_message(ChatId(id), text)
            .await
            .map_err(|e| MeshError::Transport {
                message: format!("send_message failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(msg.id.0.to_string())
    }

    async fn receive(&self) -> Result<TransportEvent, MeshError> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| MeshError::Transport {
                message: "telegram inbound channel closed".into(),
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, group: &str) -> TransportConfig {
        TransportConfig {
            bot_token: token.map(str::to_string),
            mesh_group_id: group.to_string(),
            reply_chat: None,
            operator_chat_id: None,
        }
    }

    #[test]
    fn requires_a_bot_token() {
        assert!(TelegramTransport::new(&config(None, "-1001")).is_err());
        assert!(TelegramTransport::new(&config(Some(""), "-1001")).is_err());
    }

    #[test]
    fn requires_a_group_id() {
        assert!(TelegramTransport::new(&config(Some("123:abc"), "")).is_err());
    }

    #[tokio::test]
    async fn send_rejects_a_non_numeric_chat_id() {
        let transport = TelegramTransport::new(&config(Some("123:abc"), "-1001")).unwrap();
        let err = transport.send("not-a-chat", "hello").await.unwrap_err();
        assert!(matches!(err, MeshError::Transport { .. }));
    }
}
