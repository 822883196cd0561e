// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for group-chat adapters (Telegram, mocks).

use async_trait::async_trait;

use crate::error::MeshError;

/// An inbound transport event. The engine is agnostic to transport identity
/// beyond `chat_id`/`message_id`, which feed the ingest dedup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub chat_id: String,
    /// Platform message id when the transport assigns one; events without an
    /// id are deduplicated by payload hash instead.
    pub message_id: Option<String>,
    pub text: String,
}

/// Bidirectional group-chat adapter.
///
/// Implementations are injectable so tests can drive the engine without a
/// network. Retry policy lives above this trait, in the engine's transport
/// facade; a single `send` here is one delivery attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message. Returns the platform-assigned message id.
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, MeshError>;

    /// Receive the next inbound event, waiting until one arrives.
    async fn receive(&self) -> Result<TransportEvent, MeshError>;
}
