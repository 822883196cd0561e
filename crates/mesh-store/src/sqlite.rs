// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`Store`] trait.

use async_trait::async_trait;
use tracing::debug;

use mesh_core::types::{
    AcceptOutcome, Deal, Intent, IntentStatus, Offer, Peer, ProcessedMessage,
};
use mesh_core::{MeshError, Store};

use crate::database::Database;
use crate::queries;

/// Store backed by a WAL-mode SQLite database with embedded migrations.
///
/// Writes are serialized through a single background connection, so
/// `accept_intent_offer`'s read-check-update transaction observes no
/// interleaving writers.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub async fn open(path: &str) -> Result<Self, MeshError> {
        let db = Database::open(path).await?;
        debug!(path, "sqlite store ready");
        Ok(Self { db })
    }

    /// Checkpoint the WAL; call on shutdown.
    pub async fn close(&self) -> Result<(), MeshError> {
        self.db.close().await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_peer(&self, peer: Peer) -> Result<(), MeshError> {
        queries::peers::upsert_peer(&self.db, peer).await
    }

    async fn get_peer(&self, address: &str) -> Result<Option<Peer>, MeshError> {
        queries::peers::get_peer(&self.db, address).await
    }

    async fn list_peers(&self) -> Result<Vec<Peer>, MeshError> {
        queries::peers::list_peers(&self.db).await
    }

    async fn save_intent(&self, intent: Intent) -> Result<(), MeshError> {
        queries::intents::save_intent(&self.db, intent).await
    }

    async fn get_intent(&self, id: &str) -> Result<Option<Intent>, MeshError> {
        queries::intents::get_intent(&self.db, id).await
    }

    async fn list_intents(&self, status: Option<IntentStatus>) -> Result<Vec<Intent>, MeshError> {
        queries::intents::list_intents(&self.db, status).await
    }

    async fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        now: i64,
    ) -> Result<bool, MeshError> {
        queries::intents::update_intent_status(&self.db, id, status, now).await
    }

    async fn accept_intent_offer(
        &self,
        intent_id: &str,
        offer_id: &str,
        executor: &str,
        now: i64,
    ) -> Result<AcceptOutcome, MeshError> {
        queries::intents::accept_intent_offer(&self.db, intent_id, offer_id, executor, now).await
    }

    async fn record_offer(&self, offer: Offer) -> Result<(), MeshError> {
        queries::offers::record_offer(&self.db, offer).await
    }

    async fn list_offers_for_intent(&self, intent_id: &str) -> Result<Vec<Offer>, MeshError> {
        queries::offers::list_offers_for_intent(&self.db, intent_id).await
    }

    async fn save_deal(&self, deal: Deal) -> Result<(), MeshError> {
        queries::deals::save_deal(&self.db, deal).await
    }

    async fn get_deal(&self, intent_id: &str) -> Result<Option<Deal>, MeshError> {
        queries::deals::get_deal(&self.db, intent_id).await
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, MeshError> {
        queries::deals::list_deals(&self.db).await
    }

    async fn expire_intents(&self, now: i64) -> Result<Vec<Intent>, MeshError> {
        queries::intents::expire_intents(&self.db, now).await
    }

    async fn mark_processed_message(&self, msg: ProcessedMessage) -> Result<bool, MeshError> {
        queries::processed::mark_processed_message(&self.db, msg).await
    }
}
