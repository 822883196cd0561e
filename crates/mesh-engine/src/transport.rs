// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound transport facade with bounded exponential backoff.
//!
//! The store is authoritative; a send that exhausts its retry budget
//! surfaces the error and the persisted state stands (receivers dedup, so a
//! later rebroadcast is safe).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use mesh_core::{MeshError, Transport};

/// Floor on the retry base backoff.
const MIN_RETRY_BASE_MS: u64 = 50;

/// Retrying wrapper around an injectable [`Transport`].
#[derive(Clone)]
pub struct TransportFacade {
    inner: Arc<dyn Transport>,
    retries: u32,
    base: Duration,
}

impl TransportFacade {
    pub fn new(inner: Arc<dyn Transport>, retries: u32, base_ms: u64) -> Self {
        Self {
            inner,
            retries,
            base: Duration::from_millis(base_ms.max(MIN_RETRY_BASE_MS)),
        }
    }

    /// Send with up to `retries` extra attempts, doubling the delay each
    /// time. The final error surfaces to the caller.
    pub async fn send(&self, chat_id: &str, text: &str) -> Result<String, MeshError> {
        let mut attempt: u32 = 0;
        loop {
            match self.inner.send(chat_id, text).await {
                Ok(message_id) => return Ok(message_id),
                Err(e) if attempt < self.retries => {
                    let delay = self.base * 2u32.saturating_pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "send failed, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The wrapped transport, for the inbound receive loop.
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }
}
