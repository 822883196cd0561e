// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coordination core: inbound message dispatch, the outbound tool
//! surface, and winner selection.
//!
//! Every transport event runs the same pipeline: derive the dedup key,
//! parse, gate on the processed-message insert, then dispatch per kind.
//! Protocol noise is dropped silently; precondition misses on ingest are
//! logged and dropped; backend failures propagate. The tool surface
//! (`register`, `broadcast`, `offer`, `settle`, `peers`, `dispute`)
//! surfaces every failure to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mesh_config::MeshConfig;
use mesh_core::time::{now_ms, now_ts};
use mesh_core::types::{
    AcceptOutcome, Amount, Deal, DealOutcome, Intent, IntentStatus, Offer, Peer,
    ProcessedMessage, StakeInfo, VerifyRequest,
};
use mesh_core::{MeshError, Store, Transport, TransportEvent};
use mesh_proto::{
    AcceptMsg, BeaconMsg, DisputeMsg, IntentMsg, MeshMessage, OfferMsg, SettleMsg,
};
use mesh_reputation::ReputationClient;

use crate::rank::{rank_offers, select_best, RankWeights};
use crate::transport::TransportFacade;

/// The agent's own bidding profile, updated by `register`.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub skills: Vec<String>,
    pub min_fee: Amount,
    pub stake: Amount,
    pub response_time: String,
}

/// What ingest did with one transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Handled { kind: &'static str },
    /// The dedup gate hit; nothing was written.
    Duplicate { kind: &'static str },
    /// Not a valid MESH line; dropped silently.
    ProtocolNoise,
    /// Parsed fine but a precondition failed; logged and dropped.
    Ignored { kind: &'static str, reason: &'static str },
}

/// What a selection attempt concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(Offer),
    /// Waiting for the deadline.
    Deferred,
    NoOffers,
    /// A concurrent selection won the conditional accept first.
    Lost,
    NotPending,
}

pub struct Coordinator {
    config: MeshConfig,
    address: String,
    mesh_chat: String,
    store: Arc<dyn Store>,
    reputation: Arc<ReputationClient>,
    transport: TransportFacade,
    profile: Mutex<AgentProfile>,
    registered: AtomicBool,
    last_sweep_ms: AtomicI64,
    last_beacon_ms: AtomicI64,
}

impl Coordinator {
    pub fn new(
        config: MeshConfig,
        store: Arc<dyn Store>,
        reputation: Arc<ReputationClient>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let facade = TransportFacade::new(
            transport,
            config.engine.send_retries,
            config.engine.send_retry_base_ms,
        );
        let profile = AgentProfile {
            skills: config.agent.skills.clone(),
            min_fee: config.agent.min_fee.clone(),
            stake: config.agent.stake.clone(),
            response_time: config.agent.response_time.clone(),
        };
        Self {
            address: config.agent.address.clone(),
            mesh_chat: config.transport.mesh_group_id.clone(),
            store,
            reputation,
            transport: facade,
            profile: Mutex::new(profile),
            registered: AtomicBool::new(false),
            last_sweep_ms: AtomicI64::new(0),
            last_beacon_ms: AtomicI64::new(0),
            config,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn reputation(&self) -> &Arc<ReputationClient> {
        &self.reputation
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn weights(&self) -> RankWeights {
        RankWeights {
            reputation: self.config.engine.rank_weight_reputation,
            fee: self.config.engine.rank_weight_fee,
            speed: self.config.engine.rank_weight_speed,
            tie_window: self.config.engine.tie_window,
        }
    }

    // --- Ingest pipeline ---

    /// Process one inbound transport event.
    pub async fn ingest(&self, event: &TransportEvent) -> Result<IngestOutcome, MeshError> {
        let Some(msg) = mesh_proto::parse(&event.text) else {
            debug!(chat = %event.chat_id, "dropping non-MESH chatter");
            return Ok(IngestOutcome::ProtocolNoise);
        };
        let kind = msg.kind();

        let payload_hash = sha256_hex(&event.text);
        let key = match &event.message_id {
            Some(id) => format!("consumer:{}:tg:{}:{}", self.address, event.chat_id, id),
            None => format!("consumer:{}:hash:{}", self.address, payload_hash),
        };
        let inserted = self
            .store
            .mark_processed_message(ProcessedMessage {
                key,
                message_type: kind.to_string(),
                source_chat_id: Some(event.chat_id.clone()),
                source_message_id: event.message_id.clone(),
                payload_hash,
                first_seen_at: now_ts(),
            })
            .await?;
        if !inserted {
            debug!(kind, "duplicate event, already processed");
            return Ok(IngestOutcome::Duplicate { kind });
        }

        match msg {
            MeshMessage::Beacon(m) => self.handle_beacon(m).await,
            MeshMessage::Intent(m) => self.handle_intent(m).await,
            MeshMessage::Offer(m) => self.handle_offer(m).await,
            MeshMessage::Accept(m) => self.handle_accept(m).await,
            MeshMessage::Settle(m) => self.handle_settle(m).await,
            MeshMessage::Dispute(m) => self.handle_dispute(m).await,
        }
    }

    async fn handle_beacon(&self, msg: BeaconMsg) -> Result<IngestOutcome, MeshError> {
        let live = match self.reputation.get_reputation(&msg.from).await {
            Ok(rep) => rep,
            Err(e) => {
                debug!(from = %msg.from, error = %e, "reputation lookup failed for beacon");
                None
            }
        };
        let Some(reputation) = live.filter(|r| *r > 0) else {
            debug!(from = %msg.from, "ignoring beacon: unstaked_or_unknown_peer");
            return Ok(IngestOutcome::Ignored {
                kind: "beacon",
                reason: "unstaked_or_unknown_peer",
            });
        };

        let stake_info = match self.reputation.get_stake_info(&msg.from).await {
            Ok(info) => info,
            Err(e) => {
                debug!(from = %msg.from, error = %e, "stake lookup failed, using beacon values");
                StakeInfo {
                    stake: msg.stake.clone().unwrap_or_else(|| BigDecimal::from(0)),
                    since: 0,
                    age_seconds: 0,
                }
            }
        };

        let now = now_ts();
        self.store
            .upsert_peer(Peer {
                address: msg.from.clone(),
                skills: msg.skills,
                min_fee: msg.min_fee.unwrap_or_else(|| BigDecimal::from(0)),
                response_time: msg.response_time.unwrap_or_default(),
                reputation,
                stake: stake_info.stake,
                stake_age_seconds: stake_info.age_seconds,
                reply_chat: msg.reply_chat,
                last_seen: now,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(from = %msg.from, reputation, "peer refreshed from beacon");
        Ok(IngestOutcome::Handled { kind: "beacon" })
    }

    async fn handle_intent(&self, msg: IntentMsg) -> Result<IngestOutcome, MeshError> {
        let now = now_ts();
        let payload_bytes = serde_json::to_vec(&msg.payload).map_or(usize::MAX, |b| b.len());
        if payload_bytes > self.config.engine.max_payload_bytes {
            warn!(intent = %msg.id, payload_bytes, "dropping oversize intent payload");
            return Ok(IngestOutcome::Ignored {
                kind: "intent",
                reason: "oversize_payload",
            });
        }
        if msg.budget <= BigDecimal::from(0) {
            debug!(intent = %msg.id, "dropping intent with non-positive budget");
            return Ok(IngestOutcome::Ignored {
                kind: "intent",
                reason: "non_positive_budget",
            });
        }
        if msg.deadline <= now {
            debug!(intent = %msg.id, "dropping intent with past deadline");
            return Ok(IngestOutcome::Ignored {
                kind: "intent",
                reason: "deadline_past",
            });
        }
        if msg.deadline - now > self.config.engine.max_intent_deadline_seconds {
            debug!(intent = %msg.id, "dropping intent beyond the deadline horizon");
            return Ok(IngestOutcome::Ignored {
                kind: "intent",
                reason: "deadline_beyond_horizon",
            });
        }

        self.store
            .save_intent(Intent {
                id: msg.id.clone(),
                from_address: msg.from.clone(),
                skill: msg.skill.clone(),
                payload: msg.payload.clone(),
                budget: msg.budget.clone(),
                deadline: msg.deadline,
                min_reputation: msg.min_reputation,
                status: IntentStatus::Pending,
                accepted_offer_id: None,
                selected_executor: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(intent = %msg.id, skill = %msg.skill, from = %msg.from, "intent persisted");

        if msg.from != self.address {
            self.evaluate_auto_offer(&msg).await;
        }
        Ok(IngestOutcome::Handled { kind: "intent" })
    }

    /// Bid on a freshly ingested intent when the profile fits.
    async fn evaluate_auto_offer(&self, msg: &IntentMsg) {
        let (skills, min_fee, response_time) = {
            let profile = self.profile.lock().await;
            (
                profile.skills.clone(),
                profile.min_fee.clone(),
                profile.response_time.clone(),
            )
        };
        if !skills.iter().any(|s| s == &msg.skill) {
            return;
        }

        let self_rep = match self.reputation.get_reputation(&self.address).await {
            Ok(rep) => rep.unwrap_or(0),
            Err(e) => {
                debug!(error = %e, "self reputation lookup failed, skipping auto-offer");
                return;
            }
        };
        if self_rep < msg.min_reputation {
            debug!(
                intent = %msg.id,
                self_rep,
                required = msg.min_reputation,
                "auto-offer skipped: reputation too low"
            );
            return;
        }

        let three_quarters = (&msg.budget * BigDecimal::from(3)) / BigDecimal::from(4);
        let fee = if min_fee > BigDecimal::from(0) && min_fee < three_quarters {
            min_fee
        } else {
            three_quarters
        };
        if fee <= BigDecimal::from(0) || fee > msg.budget {
            return;
        }

        match self.offer(&msg.id, fee, &response_time).await {
            Ok(offer) => info!(intent = %msg.id, fee = %offer.fee, "auto-offer submitted"),
            Err(e) => debug!(intent = %msg.id, error = %e, "auto-offer not submitted"),
        }
    }

    async fn handle_offer(&self, msg: OfferMsg) -> Result<IngestOutcome, MeshError> {
        let Some(intent) = self.store.get_intent(&msg.intent_id).await? else {
            debug!(intent = %msg.intent_id, "offer for unknown intent");
            return Ok(IngestOutcome::Ignored {
                kind: "offer",
                reason: "unknown_intent",
            });
        };
        if msg.from == intent.from_address {
            debug!(intent = %msg.intent_id, "offer from the intent creator");
            return Ok(IngestOutcome::Ignored {
                kind: "offer",
                reason: "self_offer",
            });
        }
        if msg.fee <= BigDecimal::from(0) {
            return Ok(IngestOutcome::Ignored {
                kind: "offer",
                reason: "non_positive_fee",
            });
        }
        if msg.fee > intent.budget {
            debug!(intent = %msg.intent_id, fee = %msg.fee, budget = %intent.budget, "offer over budget");
            return Ok(IngestOutcome::Ignored {
                kind: "offer",
                reason: "fee_exceeds_budget",
            });
        }

        let stake_age = match self.reputation.get_stake_info(&msg.from).await {
            Ok(info) => info.age_seconds,
            Err(_) => 0,
        };
        let now = now_ts();
        self.store
            .record_offer(Offer {
                id: Offer::derive_id(&msg.intent_id, &msg.from, now),
                intent_id: msg.intent_id.clone(),
                from_address: msg.from.clone(),
                fee: msg.fee.clone(),
                eta: msg.eta.clone(),
                reputation: msg.reputation,
                stake_age_seconds: stake_age,
                escrow_address: msg.escrow_address.clone(),
                created_at: now,
            })
            .await?;
        info!(intent = %msg.intent_id, from = %msg.from, fee = %msg.fee, "offer recorded");

        if intent.from_address == self.address && intent.status == IntentStatus::Pending {
            match self.try_select(&msg.intent_id, true).await? {
                SelectionOutcome::Selected(offer) => {
                    info!(intent = %msg.intent_id, executor = %offer.from_address, "winner selected");
                }
                SelectionOutcome::Deferred => {
                    debug!(intent = %msg.intent_id, "selection deferred to the deadline");
                }
                other => debug!(intent = %msg.intent_id, ?other, "selection not performed"),
            }
        }
        Ok(IngestOutcome::Handled { kind: "offer" })
    }

    async fn handle_accept(&self, msg: AcceptMsg) -> Result<IngestOutcome, MeshError> {
        let Some(intent) = self.store.get_intent(&msg.intent_id).await? else {
            debug!(intent = %msg.intent_id, "accept for unknown intent");
            return Ok(IngestOutcome::Ignored {
                kind: "accept",
                reason: "unknown_intent",
            });
        };

        let now = now_ts();
        if intent.status == IntentStatus::Pending {
            let selected_at = msg.selected_at.unwrap_or(now);
            // Prefer the locally recorded offer from the announced executor;
            // synthesize the derived id when we never saw it.
            let offer_id = self
                .store
                .list_offers_for_intent(&msg.intent_id)
                .await?
                .into_iter()
                .filter(|o| o.from_address == msg.to)
                .max_by_key(|o| o.created_at)
                .map(|o| o.id)
                .unwrap_or_else(|| Offer::derive_id(&msg.intent_id, &msg.to, selected_at));

            let outcome = self
                .store
                .accept_intent_offer(&msg.intent_id, &offer_id, &msg.to, now)
                .await?;
            if outcome == AcceptOutcome::Accepted {
                info!(intent = %msg.intent_id, executor = %msg.to, "intent accepted from broadcast");
            }
        }

        self.store
            .save_deal(Deal {
                intent_id: msg.intent_id.clone(),
                executor_address: msg.to.clone(),
                fee: msg.fee.clone(),
                tx_hash: None,
                outcome: None,
                rating: None,
                settled_at: None,
                updated_at: now,
            })
            .await?;

        if msg.to == self.address {
            self.notify_operator(&format!(
                "selected as executor for intent {} (fee {})",
                msg.intent_id, msg.fee
            ))
            .await;
        }
        Ok(IngestOutcome::Handled { kind: "accept" })
    }

    async fn handle_settle(&self, msg: SettleMsg) -> Result<IngestOutcome, MeshError> {
        let Some(intent) = self.store.get_intent(&msg.intent_id).await? else {
            debug!(intent = %msg.intent_id, "settle for unknown intent");
            return Ok(IngestOutcome::Ignored {
                kind: "settle",
                reason: "unknown_intent",
            });
        };

        let now = now_ts();
        let fee = self.resolve_deal_fee(&intent).await?;
        self.store
            .save_deal(Deal {
                intent_id: msg.intent_id.clone(),
                executor_address: msg.from.clone(),
                fee,
                tx_hash: Some(msg.tx_hash.clone()),
                outcome: Some(msg.outcome),
                rating: Some(msg.rating),
                settled_at: Some(now),
                updated_at: now,
            })
            .await?;

        match self
            .reputation
            .record_outcome(&msg.from, &msg.tx_hash, msg.rating)
            .await
        {
            Ok(score) => info!(executor = %msg.from, score, "settlement outcome recorded"),
            Err(MeshError::Replay { tx_hash }) => {
                warn!(executor = %msg.from, tx_hash = %tx_hash, "settlement replay ignored");
                return Ok(IngestOutcome::Ignored {
                    kind: "settle",
                    reason: "outcome_replay",
                });
            }
            Err(e) => {
                warn!(executor = %msg.from, error = %e, "outcome not recorded");
            }
        }

        let settled = self
            .store
            .update_intent_status(&msg.intent_id, IntentStatus::Settled, now)
            .await?;
        if !settled {
            debug!(intent = %msg.intent_id, "settle did not transition (not accepted)");
        }
        Ok(IngestOutcome::Handled { kind: "settle" })
    }

    async fn handle_dispute(&self, msg: DisputeMsg) -> Result<IngestOutcome, MeshError> {
        warn!(
            intent = %msg.intent_id,
            from = %msg.from,
            against = %msg.against,
            reason = msg.reason.as_deref().unwrap_or("unspecified"),
            "dispute raised"
        );
        if msg.against == self.address || self.is_own_intent(&msg.intent_id).await? {
            self.notify_operator(&format!(
                "dispute on intent {} against {} ({})",
                msg.intent_id,
                msg.against,
                msg.reason.as_deref().unwrap_or("unspecified")
            ))
            .await;
        }
        Ok(IngestOutcome::Handled { kind: "dispute" })
    }

    async fn is_own_intent(&self, intent_id: &str) -> Result<bool, MeshError> {
        Ok(self
            .store
            .get_intent(intent_id)
            .await?
            .is_some_and(|i| i.from_address == self.address))
    }

    // --- Tool surface ---

    /// Register on chain, refresh the self-peer row, and broadcast a beacon.
    pub async fn register(
        &self,
        skills: Vec<String>,
        min_fee: Amount,
        stake: Amount,
    ) -> Result<(), MeshError> {
        if min_fee < BigDecimal::from(0) {
            return Err(MeshError::Validation("min_fee must be non-negative".into()));
        }

        self.reputation.register_agent(&self.address, &stake).await?;

        {
            let mut profile = self.profile.lock().await;
            profile.skills = skills.clone();
            profile.min_fee = min_fee.clone();
            profile.stake = stake.clone();
        }

        let reputation = self
            .reputation
            .get_reputation(&self.address)
            .await?
            .unwrap_or(0);
        let stake_info = self.reputation.get_stake_info(&self.address).await?;
        let now = now_ts();
        self.store
            .upsert_peer(Peer {
                address: self.address.clone(),
                skills,
                min_fee,
                response_time: self.profile.lock().await.response_time.clone(),
                reputation,
                stake: stake_info.stake,
                stake_age_seconds: stake_info.age_seconds,
                reply_chat: self.config.transport.reply_chat.clone(),
                last_seen: now,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.registered.store(true, Ordering::SeqCst);
        self.send_beacon().await?;
        info!(address = %self.address, "registered and beaconed");
        Ok(())
    }

    /// Persist a new intent and broadcast it.
    pub async fn broadcast(
        &self,
        skill: &str,
        payload: serde_json::Value,
        budget: Amount,
        deadline: i64,
        min_reputation: i64,
    ) -> Result<Intent, MeshError> {
        self.maybe_sweep().await?;

        let now = now_ts();
        if budget <= BigDecimal::from(0) {
            return Err(MeshError::Validation("budget must be positive".into()));
        }
        if min_reputation < 0 {
            return Err(MeshError::Validation(
                "min_reputation must be non-negative".into(),
            ));
        }
        if deadline <= now {
            return Err(MeshError::Validation("deadline is in the past".into()));
        }
        if deadline - now > self.config.engine.max_intent_deadline_seconds {
            return Err(MeshError::Validation(format!(
                "deadline exceeds the {}s horizon",
                self.config.engine.max_intent_deadline_seconds
            )));
        }
        if !(payload.is_object() || payload.is_array()) {
            return Err(MeshError::Validation(
                "payload must be a JSON object or array".into(),
            ));
        }
        let payload_bytes = serde_json::to_vec(&payload).map_or(usize::MAX, |b| b.len());
        if payload_bytes > self.config.engine.max_payload_bytes {
            return Err(MeshError::Validation(format!(
                "payload is {payload_bytes} bytes, cap is {}",
                self.config.engine.max_payload_bytes
            )));
        }

        let intent = Intent {
            id: Uuid::new_v4().to_string(),
            from_address: self.address.clone(),
            skill: skill.to_string(),
            payload: payload.clone(),
            budget: budget.clone(),
            deadline,
            min_reputation,
            status: IntentStatus::Pending,
            accepted_offer_id: None,
            selected_executor: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save_intent(intent.clone()).await?;

        let wire = MeshMessage::Intent(IntentMsg {
            v: "1.0".to_string(),
            id: intent.id.clone(),
            from: self.address.clone(),
            skill: skill.to_string(),
            budget,
            deadline,
            min_reputation,
            payload,
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;
        info!(intent = %intent.id, skill, "intent broadcast");
        Ok(intent)
    }

    /// Record and broadcast a bid on someone else's pending intent.
    pub async fn offer(
        &self,
        intent_id: &str,
        fee: Amount,
        eta: &str,
    ) -> Result<Offer, MeshError> {
        self.maybe_sweep().await?;

        if fee <= BigDecimal::from(0) {
            return Err(MeshError::Validation("fee must be positive".into()));
        }
        let intent = self
            .store
            .get_intent(intent_id)
            .await?
            .ok_or_else(|| MeshError::Precondition(format!("intent {intent_id} not found")))?;
        if intent.status != IntentStatus::Pending {
            return Err(MeshError::Precondition(format!(
                "intent {intent_id} is {}, not pending",
                intent.status
            )));
        }
        if intent.from_address == self.address {
            return Err(MeshError::Precondition(
                "cannot bid on own intent".to_string(),
            ));
        }
        {
            let profile = self.profile.lock().await;
            if !profile.skills.iter().any(|s| s == &intent.skill) {
                return Err(MeshError::Precondition(format!(
                    "skill {} not offered by this agent",
                    intent.skill
                )));
            }
        }
        let self_rep = self
            .reputation
            .get_reputation(&self.address)
            .await?
            .unwrap_or(0);
        if self_rep < intent.min_reputation {
            return Err(MeshError::Precondition(format!(
                "reputation {self_rep} below required {}",
                intent.min_reputation
            )));
        }
        if fee > intent.budget {
            return Err(MeshError::Precondition(format!(
                "fee {fee} exceeds budget {}",
                intent.budget
            )));
        }

        let stake_age = match self.reputation.get_stake_info(&self.address).await {
            Ok(info) => info.age_seconds,
            Err(_) => 0,
        };
        let now = now_ts();
        let offer = Offer {
            id: Offer::derive_id(intent_id, &self.address, now),
            intent_id: intent_id.to_string(),
            from_address: self.address.clone(),
            fee: fee.clone(),
            eta: eta.to_string(),
            reputation: Some(self_rep),
            stake_age_seconds: stake_age,
            escrow_address: None,
            created_at: now,
        };
        self.store.record_offer(offer.clone()).await?;

        let wire = MeshMessage::Offer(OfferMsg {
            v: "1.0".to_string(),
            intent_id: intent_id.to_string(),
            from: self.address.clone(),
            fee,
            eta: eta.to_string(),
            reputation: Some(self_rep),
            escrow_address: None,
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;
        Ok(offer)
    }

    /// Verify the payment, record the outcome, finalize the deal, and
    /// broadcast the settlement.
    pub async fn settle(
        &self,
        intent_id: &str,
        tx_hash: &str,
        outcome: DealOutcome,
        rating: i64,
    ) -> Result<Deal, MeshError> {
        self.maybe_sweep().await?;

        if !(1..=10).contains(&rating) {
            return Err(MeshError::Validation(format!(
                "rating {rating} outside [1..10]"
            )));
        }
        if tx_hash.trim().is_empty() {
            return Err(MeshError::Validation("tx_hash is required".into()));
        }
        let intent = self
            .store
            .get_intent(intent_id)
            .await?
            .ok_or_else(|| MeshError::Precondition(format!("intent {intent_id} not found")))?;
        if intent.status != IntentStatus::Accepted {
            return Err(MeshError::Precondition(format!(
                "intent {intent_id} is {}, not accepted",
                intent.status
            )));
        }
        if intent.selected_executor.as_deref() != Some(self.address.as_str()) {
            return Err(MeshError::Precondition(
                "only the selected executor settles".to_string(),
            ));
        }

        let fee = self.resolve_deal_fee(&intent).await?;
        let mut request = VerifyRequest::new(tx_hash, fee.clone(), self.address.clone());
        request.expected_sender = Some(intent.from_address.clone());
        request.intent_id = Some(intent_id.to_string());
        let verdict = self.reputation.verify_payment(&request).await?;
        if let Some(reason) = verdict.failure_reason() {
            return Err(MeshError::Verification { reason });
        }

        let score = self
            .reputation
            .record_outcome(&self.address, tx_hash, rating)
            .await?;

        let now = now_ts();
        let deal = Deal {
            intent_id: intent_id.to_string(),
            executor_address: self.address.clone(),
            fee,
            tx_hash: Some(tx_hash.to_string()),
            outcome: Some(outcome),
            rating: Some(rating),
            settled_at: Some(now),
            updated_at: now,
        };
        self.store.save_deal(deal.clone()).await?;
        self.store
            .update_intent_status(intent_id, IntentStatus::Settled, now)
            .await?;

        let wire = MeshMessage::Settle(SettleMsg {
            v: "1.0".to_string(),
            intent_id: intent_id.to_string(),
            from: self.address.clone(),
            tx_hash: tx_hash.to_string(),
            outcome,
            rating,
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;
        info!(intent = %intent_id, score, "settled");
        Ok(deal)
    }

    /// All known peers, most recently seen first.
    pub async fn peers(&self) -> Result<Vec<Peer>, MeshError> {
        self.maybe_sweep().await?;
        self.store.list_peers().await
    }

    /// Broadcast a dispute against a counterparty on a known intent.
    pub async fn dispute(
        &self,
        intent_id: &str,
        against: &str,
        reason: Option<String>,
        evidence_tx: Option<String>,
    ) -> Result<(), MeshError> {
        if self.store.get_intent(intent_id).await?.is_none() {
            return Err(MeshError::Precondition(format!(
                "intent {intent_id} not found"
            )));
        }
        let wire = MeshMessage::Dispute(DisputeMsg {
            v: "1.0".to_string(),
            intent_id: intent_id.to_string(),
            from: self.address.clone(),
            against: against.to_string(),
            reason,
            evidence_tx,
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;
        Ok(())
    }

    // --- Selection ---

    /// Rank the intent's offers and try to win the conditional accept.
    ///
    /// With `respect_wait`, a `wait_for_deadline` configuration defers any
    /// selection before the deadline; the scheduler passes `false` once the
    /// deadline has arrived.
    pub async fn try_select(
        &self,
        intent_id: &str,
        respect_wait: bool,
    ) -> Result<SelectionOutcome, MeshError> {
        let Some(intent) = self.store.get_intent(intent_id).await? else {
            return Ok(SelectionOutcome::NotPending);
        };
        if intent.status != IntentStatus::Pending {
            return Ok(SelectionOutcome::NotPending);
        }
        let now = now_ts();
        if respect_wait && self.config.engine.wait_for_deadline && now < intent.deadline {
            return Ok(SelectionOutcome::Deferred);
        }

        let offers = self.store.list_offers_for_intent(intent_id).await?;
        if offers.is_empty() {
            return Ok(SelectionOutcome::NoOffers);
        }

        let mut live_reputation = HashMap::new();
        for offer in &offers {
            match self.reputation.get_reputation(&offer.from_address).await {
                Ok(Some(rep)) => {
                    live_reputation.insert(offer.from_address.clone(), rep);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(from = %offer.from_address, error = %e, "live reputation unavailable");
                }
            }
        }

        let weights = self.weights();
        let ranked = rank_offers(&offers, &live_reputation, &weights);
        let Some(best) = select_best(&ranked, weights.tie_window) else {
            return Ok(SelectionOutcome::NoOffers);
        };
        let winner = best.offer.clone();

        match self
            .store
            .accept_intent_offer(intent_id, &winner.id, &winner.from_address, now)
            .await?
        {
            AcceptOutcome::Accepted => {}
            AcceptOutcome::NotPending => return Ok(SelectionOutcome::Lost),
            AcceptOutcome::NotFound => return Ok(SelectionOutcome::NotPending),
        }

        let wire = MeshMessage::Accept(AcceptMsg {
            v: "1.0".to_string(),
            intent_id: intent_id.to_string(),
            from: self.address.clone(),
            to: winner.from_address.clone(),
            fee: winner.fee.clone(),
            selected_at: Some(now),
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;

        self.store
            .save_deal(Deal {
                intent_id: intent_id.to_string(),
                executor_address: winner.from_address.clone(),
                fee: winner.fee.clone(),
                tx_hash: None,
                outcome: None,
                rating: None,
                settled_at: None,
                updated_at: now,
            })
            .await?;

        Ok(SelectionOutcome::Selected(winner))
    }

    // --- Scheduler entry points ---

    /// One scheduler pass: deadline-due selection, the lazy expiry sweep,
    /// and the beacon refresh. Never fails; errors are logged and the next
    /// tick retries.
    pub async fn tick(&self) {
        let now = now_ts();

        match self.store.list_intents(Some(IntentStatus::Pending)).await {
            Ok(pending) => {
                for intent in pending
                    .iter()
                    .filter(|i| i.from_address == self.address && i.deadline <= now)
                {
                    match self.try_select(&intent.id, false).await {
                        Ok(SelectionOutcome::Selected(offer)) => {
                            info!(intent = %intent.id, executor = %offer.from_address, "deadline selection");
                        }
                        Ok(SelectionOutcome::NoOffers) => {
                            match self
                                .store
                                .update_intent_status(&intent.id, IntentStatus::Expired, now)
                                .await
                            {
                                Ok(true) => info!(intent = %intent.id, "expired with no offers"),
                                Ok(false) => {}
                                Err(e) => warn!(intent = %intent.id, error = %e, "expiry failed"),
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(intent = %intent.id, error = %e, "deadline selection failed"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "pending-intent listing failed"),
        }

        if let Err(e) = self.maybe_sweep().await {
            warn!(error = %e, "expiry sweep failed");
        }

        self.maybe_refresh_beacon().await;
    }

    /// Lazy expiry sweep, spaced by `expiry_sweep_interval_ms`. Shared by
    /// the scheduler and the tool path.
    async fn maybe_sweep(&self) -> Result<(), MeshError> {
        let now = now_ms();
        let last = self.last_sweep_ms.load(Ordering::SeqCst);
        if now - last < self.config.engine.expiry_sweep_interval_ms as i64 {
            return Ok(());
        }
        self.last_sweep_ms.store(now, Ordering::SeqCst);

        let expired = self.store.expire_intents(now_ts()).await?;
        if !expired.is_empty() {
            info!(count = expired.len(), "expired stale intents");
        }
        Ok(())
    }

    async fn maybe_refresh_beacon(&self) {
        if !self.registered.load(Ordering::SeqCst) {
            return;
        }
        let now = now_ms();
        let last = self.last_beacon_ms.load(Ordering::SeqCst);
        let period = self.config.engine.beacon_refresh_seconds as i64 * 1000;
        if now - last < period {
            return;
        }
        if let Err(e) = self.send_beacon().await {
            warn!(error = %e, "beacon refresh failed");
        }
    }

    /// Broadcast the agent's beacon from the current profile.
    pub async fn send_beacon(&self) -> Result<(), MeshError> {
        let profile = self.profile.lock().await.clone();
        let wire = MeshMessage::Beacon(BeaconMsg {
            v: "1.0".to_string(),
            from: self.address.clone(),
            skills: profile.skills,
            min_fee: Some(profile.min_fee),
            response_time: Some(profile.response_time),
            stake: Some(profile.stake),
            reply_chat: self.config.transport.reply_chat.clone(),
        });
        self.transport
            .send(&self.mesh_chat, &mesh_proto::serialize(&wire))
            .await?;
        self.last_beacon_ms.store(now_ms(), Ordering::SeqCst);
        Ok(())
    }

    // --- Helpers ---

    /// The fee owed on an intent: the pre-seeded deal, else the accepted
    /// offer, else the full budget.
    async fn resolve_deal_fee(&self, intent: &Intent) -> Result<Amount, MeshError> {
        if let Some(deal) = self.store.get_deal(&intent.id).await? {
            return Ok(deal.fee);
        }
        if let Some(offer_id) = &intent.accepted_offer_id {
            let offers = self.store.list_offers_for_intent(&intent.id).await?;
            if let Some(offer) = offers.into_iter().find(|o| &o.id == offer_id) {
                return Ok(offer.fee);
            }
        }
        Ok(intent.budget.clone())
    }

    /// Best-effort operator notice; failures are logged, never propagated.
    async fn notify_operator(&self, text: &str) {
        let Some(chat) = &self.config.transport.operator_chat_id else {
            return;
        };
        if let Err(e) = self.transport.send(chat, text).await {
            warn!(error = %e, "operator notice failed");
        }
    }
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
