// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the [`Store`] trait.
//!
//! The default backend when no database is configured, and the workhorse of
//! the test suites. One async mutex guards the whole state, which makes
//! every operation — including the conditional accept — trivially atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mesh_core::types::{
    AcceptOutcome, Deal, Intent, IntentStatus, Offer, Peer, ProcessedMessage,
};
use mesh_core::{MeshError, Store};

#[derive(Default)]
struct MemoryState {
    peers: HashMap<String, Peer>,
    intents: HashMap<String, Intent>,
    offers: HashMap<String, Offer>,
    deals: HashMap<String, Deal>,
    processed: HashMap<String, ProcessedMessage>,
}

/// Map-backed store with the same externally-visible semantics as the
/// SQLite and REST backends.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_peer(&self, peer: Peer) -> Result<(), MeshError> {
        let mut state = self.state.lock().await;
        match state.peers.get_mut(&peer.address) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = Peer { created_at, ..peer };
            }
            None => {
                state.peers.insert(peer.address.clone(), peer);
            }
        }
        Ok(())
    }

    async fn get_peer(&self, address: &str) -> Result<Option<Peer>, MeshError> {
        Ok(self.state.lock().await.peers.get(address).cloned())
    }

    async fn list_peers(&self) -> Result<Vec<Peer>, MeshError> {
        let state = self.state.lock().await;
        let mut peers: Vec<Peer> = state.peers.values().cloned().collect();
        peers.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(peers)
    }

    async fn save_intent(&self, intent: Intent) -> Result<(), MeshError> {
        let mut state = self.state.lock().await;
        state.intents.entry(intent.id.clone()).or_insert(intent);
        Ok(())
    }

    async fn get_intent(&self, id: &str) -> Result<Option<Intent>, MeshError> {
        Ok(self.state.lock().await.intents.get(id).cloned())
    }

    async fn list_intents(&self, status: Option<IntentStatus>) -> Result<Vec<Intent>, MeshError> {
        let state = self.state.lock().await;
        let mut intents: Vec<Intent> = state
            .intents
            .values()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        intents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(intents)
    }

    async fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        now: i64,
    ) -> Result<bool, MeshError> {
        let required_prior = match status {
            IntentStatus::Expired => IntentStatus::Pending,
            IntentStatus::Settled => IntentStatus::Accepted,
            IntentStatus::Pending | IntentStatus::Accepted => {
                return Err(MeshError::Precondition(format!(
                    "illegal direct transition to {status}; accepted goes through accept_intent_offer"
                )))
            }
        };
        let mut state = self.state.lock().await;
        match state.intents.get_mut(id) {
            Some(intent) if intent.status == required_prior => {
                intent.status = status;
                intent.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn accept_intent_offer(
        &self,
        intent_id: &str,
        offer_id: &str,
        executor: &str,
        now: i64,
    ) -> Result<AcceptOutcome, MeshError> {
        let mut state = self.state.lock().await;
        match state.intents.get_mut(intent_id) {
            None => Ok(AcceptOutcome::NotFound),
            Some(intent) if intent.status != IntentStatus::Pending => {
                Ok(AcceptOutcome::NotPending)
            }
            Some(intent) => {
                intent.status = IntentStatus::Accepted;
                intent.accepted_offer_id = Some(offer_id.to_string());
                intent.selected_executor = Some(executor.to_string());
                intent.updated_at = now;
                Ok(AcceptOutcome::Accepted)
            }
        }
    }

    async fn record_offer(&self, offer: Offer) -> Result<(), MeshError> {
        self.state
            .lock()
            .await
            .offers
            .insert(offer.id.clone(), offer);
        Ok(())
    }

    async fn list_offers_for_intent(&self, intent_id: &str) -> Result<Vec<Offer>, MeshError> {
        let state = self.state.lock().await;
        let mut offers: Vec<Offer> = state
            .offers
            .values()
            .filter(|o| o.intent_id == intent_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(offers)
    }

    async fn save_deal(&self, deal: Deal) -> Result<(), MeshError> {
        self.state
            .lock()
            .await
            .deals
            .insert(deal.intent_id.clone(), deal);
        Ok(())
    }

    async fn get_deal(&self, intent_id: &str) -> Result<Option<Deal>, MeshError> {
        Ok(self.state.lock().await.deals.get(intent_id).cloned())
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, MeshError> {
        let state = self.state.lock().await;
        let mut deals: Vec<Deal> = state.deals.values().cloned().collect();
        // Most recently settled first; unsettled rows last.
        deals.sort_by(|a, b| match (b.settled_at, a.settled_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(deals)
    }

    async fn expire_intents(&self, now: i64) -> Result<Vec<Intent>, MeshError> {
        let mut state = self.state.lock().await;
        let mut expired = Vec::new();
        for intent in state.intents.values_mut() {
            if intent.status == IntentStatus::Pending && intent.deadline < now {
                intent.status = IntentStatus::Expired;
                intent.updated_at = now;
                expired.push(intent.clone());
            }
        }
        expired.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(expired)
    }

    async fn mark_processed_message(&self, msg: ProcessedMessage) -> Result<bool, MeshError> {
        let mut state = self.state.lock().await;
        if state.processed.contains_key(&msg.key) {
            return Ok(false);
        }
        state.processed.insert(msg.key.clone(), msg);
        Ok(true)
    }
}
