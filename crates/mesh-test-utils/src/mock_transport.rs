// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic engine tests.
//!
//! Two queues: events injected via [`MockTransport::inject`] are returned by
//! `receive()`, and everything passed to `send()` is captured for
//! assertions. A failure budget lets retry behavior be exercised.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use mesh_core::{MeshError, Transport, TransportEvent};

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
}

/// A mock group-chat transport.
#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<VecDeque<TransportEvent>>,
    sent: Mutex<Vec<SentMessage>>,
    notify: Notify,
    next_message_id: AtomicU64,
    failures_remaining: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inbound event for the next `receive()` call.
    pub async fn inject(&self, event: TransportEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Queue an inbound text line with a transport-assigned message id.
    pub async fn inject_line(&self, chat_id: &str, message_id: &str, text: &str) {
        self.inject(TransportEvent {
            chat_id: chat_id.to_string(),
            message_id: Some(message_id.to_string()),
            text: text.to_string(),
        })
        .await;
    }

    /// Everything sent so far.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Make the next `n` send attempts fail, to drive retry paths.
    pub fn fail_next_sends(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, MeshError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(MeshError::Transport {
                message: "injected send failure".to_string(),
                source: None,
            });
        }

        self.sent.lock().await.push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mock-{id}"))
    }

    async fn receive(&self) -> Result<TransportEvent, MeshError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_injected_events_in_order() {
        let transport = MockTransport::new();
        transport.inject_line("g", "1", "first").await;
        transport.inject_line("g", "2", "second").await;

        assert_eq!(transport.receive().await.unwrap().text, "first");
        assert_eq!(transport.receive().await.unwrap().text, "second");
    }

    #[tokio::test]
    async fn send_captures_messages() {
        let transport = MockTransport::new();
        let id = transport.send("g", "hello").await.unwrap();
        assert!(id.starts_with("mock-"));
        assert_eq!(
            transport.sent_messages().await,
            vec![SentMessage {
                chat_id: "g".to_string(),
                text: "hello".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn failure_budget_drains() {
        let transport = MockTransport::new();
        transport.fail_next_sends(1);
        assert!(transport.send("g", "x").await.is_err());
        assert!(transport.send("g", "x").await.is_ok());
        assert_eq!(transport.sent_count().await, 1);
    }
}
