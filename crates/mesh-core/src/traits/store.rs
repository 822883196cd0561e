// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait for persistence backends (SQLite, REST, in-memory).

use async_trait::async_trait;

use crate::error::MeshError;
use crate::types::{
    AcceptOutcome, Deal, Intent, IntentStatus, Offer, Peer, ProcessedMessage,
};

/// Durable registry for peers, intents, offers, deals, and the
/// processed-message dedup set.
///
/// The Store is the sole authority for persistent state; every other
/// component reads and writes only through this trait. All three backends
/// expose identical externally-visible semantics, enforced by a shared
/// conformance suite.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or refresh a peer. `created_at` is preserved on refresh.
    async fn upsert_peer(&self, peer: Peer) -> Result<(), MeshError>;

    async fn get_peer(&self, address: &str) -> Result<Option<Peer>, MeshError>;

    /// All peers, most recently seen first.
    async fn list_peers(&self) -> Result<Vec<Peer>, MeshError>;

    /// Insert an intent if absent. An existing row is left untouched so a
    /// re-delivered intent message can never reset local lifecycle state.
    async fn save_intent(&self, intent: Intent) -> Result<(), MeshError>;

    async fn get_intent(&self, id: &str) -> Result<Option<Intent>, MeshError>;

    async fn list_intents(&self, status: Option<IntentStatus>) -> Result<Vec<Intent>, MeshError>;

    /// Apply a lifecycle transition. Only the legal edges are ever written:
    /// `Expired` requires the row to still be `Pending`, `Settled` requires
    /// `Accepted`. Returns whether a row was updated. The `Accepted` edge is
    /// reserved for [`Store::accept_intent_offer`].
    async fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        now: i64,
    ) -> Result<bool, MeshError>;

    /// The only atomic multi-field write in the system: conditionally move a
    /// pending intent to `Accepted`, recording the winning offer and
    /// executor. Any two concurrent calls for the same intent produce
    /// exactly one [`AcceptOutcome::Accepted`].
    async fn accept_intent_offer(
        &self,
        intent_id: &str,
        offer_id: &str,
        executor: &str,
        now: i64,
    ) -> Result<AcceptOutcome, MeshError>;

    async fn record_offer(&self, offer: Offer) -> Result<(), MeshError>;

    /// Offers for an intent, oldest first.
    async fn list_offers_for_intent(&self, intent_id: &str) -> Result<Vec<Offer>, MeshError>;

    /// Upsert the deal row keyed by intent id: pre-seed on accept (null
    /// outcome), finalize on settle.
    async fn save_deal(&self, deal: Deal) -> Result<(), MeshError>;

    async fn get_deal(&self, intent_id: &str) -> Result<Option<Deal>, MeshError>;

    /// All deals, most recently settled first (unsettled last).
    async fn list_deals(&self) -> Result<Vec<Deal>, MeshError>;

    /// Batch-expire every pending intent whose deadline passed strictly
    /// before `now`. Returns the intents that were transitioned.
    async fn expire_intents(&self, now: i64) -> Result<Vec<Intent>, MeshError>;

    /// Insert-ignore on the dedup key. Returns `true` only for the first
    /// insert of a key in the store's lifetime; callers treat `false` as
    /// "already processed, drop".
    async fn mark_processed_message(&self, msg: ProcessedMessage) -> Result<bool, MeshError>;
}
