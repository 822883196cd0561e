// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the MESH coordination engine.
//!
//! All timestamps are unix-seconds. Monetary amounts are arbitrary-precision
//! decimals ([`Amount`]); they cross the wire as decimal strings and are
//! converted to base-unit integers only at the chain boundary.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Monetary amount (budget, fee, stake). Non-negative by construction at
/// every validation boundary.
pub type Amount = BigDecimal;

/// Lifecycle state of an intent.
///
/// Transitions form a DAG: `Pending -> Accepted -> Settled` and
/// `Pending -> Expired`. No other transition is ever applied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Accepted,
    Expired,
    Settled,
}

/// Outcome reported by the executor at settlement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DealOutcome {
    Success,
    Failure,
}

/// Reasons a payment verification can fail. The set is fixed; callers match
/// on it and the string form is part of the tool-surface contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerifyFailReason {
    MissingTxHash,
    MissingExpectedRecipient,
    InvalidVerifyParams,
    TxLookupFailed,
    TxNotFoundInRecentRecipientHistory,
    TxHasNoInternalInbound,
    RecipientMismatch,
    SenderMismatch,
    AmountMismatch,
    TxTooOld,
    TxFailed,
}

/// A known participant, created or refreshed by beacon ingest or by the
/// local agent's own register path. Peers are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    /// Chain address (primary key).
    pub address: String,
    /// Advertised skills.
    pub skills: Vec<String>,
    /// Minimum fee the peer bids.
    pub min_fee: Amount,
    /// Opaque display string ("~5s", "same day", ...).
    pub response_time: String,
    /// Live reputation at last refresh.
    pub reputation: i64,
    /// Live stake at last refresh.
    pub stake: Amount,
    /// Seconds since the peer first registered stake.
    pub stake_age_seconds: i64,
    /// Optional transport channel for direct replies.
    pub reply_chat: Option<String>,
    pub last_seen: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A request for work; the atomic unit of coordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Client-chosen UUID.
    pub id: String,
    pub from_address: String,
    pub skill: String,
    /// Opaque structured bag, capped at `max_payload_bytes` when serialized.
    pub payload: serde_json::Value,
    pub budget: Amount,
    /// Unix-seconds; strictly in the future at creation.
    pub deadline: i64,
    pub min_reputation: i64,
    pub status: IntentStatus,
    /// Set exactly once, on the transition to `Accepted`.
    pub accepted_offer_id: Option<String>,
    /// Set exactly once, on the transition to `Accepted`.
    pub selected_executor: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A bid against an intent. Offers are retained after the intent leaves
/// `Pending` so the selection history stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Derived: `intentId:fromAddress:createdAt`.
    pub id: String,
    pub intent_id: String,
    pub from_address: String,
    pub fee: Amount,
    /// Duration string ("5s", "2m", ...), parseable to seconds.
    pub eta: String,
    /// Reputation snapshot at submission; live lookup wins over it.
    pub reputation: Option<i64>,
    pub stake_age_seconds: i64,
    pub escrow_address: Option<String>,
    pub created_at: i64,
}

impl Offer {
    /// The derived offer id shared by every backend.
    pub fn derive_id(intent_id: &str, from_address: &str, created_at: i64) -> String {
        format!("{intent_id}:{from_address}:{created_at}")
    }
}

/// The post-accept record tying an intent to its executor and payment.
/// Pre-seeded (null outcome) on accept, finalized on settle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Primary key; 1-to-1 with the intent.
    pub intent_id: String,
    pub executor_address: String,
    pub fee: Amount,
    pub tx_hash: Option<String>,
    pub outcome: Option<DealOutcome>,
    /// Settlement rating in [1..10].
    pub rating: Option<i64>,
    pub settled_at: Option<i64>,
    pub updated_at: i64,
}

/// Dedup record for at-least-once ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    /// `consumer:<own>:tg:<chatId>:<messageId>` or `consumer:<own>:hash:<sha256>`.
    pub key: String,
    pub message_type: String,
    pub source_chat_id: Option<String>,
    pub source_message_id: Option<String>,
    pub payload_hash: String,
    pub first_seen_at: i64,
}

/// Result of the conditional accept-intent-offer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// This caller won the transition; exactly one caller ever does.
    Accepted,
    /// The intent exists but is no longer pending.
    NotPending,
    /// No intent with the given id.
    NotFound,
}

/// Stake position reported by the reputation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeInfo {
    pub stake: Amount,
    /// Unix-seconds of first registration; 0 when unknown.
    pub since: i64,
    /// `max(0, now - since)`.
    pub age_seconds: i64,
}

/// Result of a slash operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashResult {
    pub slashed_stake: Amount,
    pub remaining_stake: Amount,
    pub reputation: i64,
}

/// A chain transaction as seen by the payment verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxSummary {
    /// Hash in any accepted encoding; compared after normalization.
    pub hash: String,
    /// Sender of the inbound internal message; `None` when the transaction
    /// has no internal inbound (external-only).
    pub source: Option<String>,
    pub destination: String,
    pub amount: Amount,
    /// Unix-seconds the transaction landed.
    pub utime: i64,
    pub aborted: bool,
    pub compute_failed: bool,
}

/// Parameters for settlement-time payment verification.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub tx_hash: String,
    pub amount: Amount,
    pub expected_recipient: String,
    pub expected_sender: Option<String>,
    pub intent_id: Option<String>,
    pub max_tx_age_seconds: Option<i64>,
    pub lookback_limit: Option<usize>,
    /// When true (the default), a payment larger than `amount` also passes.
    pub allow_amount_greater_or_equal: bool,
}

impl VerifyRequest {
    pub fn new(tx_hash: impl Into<String>, amount: Amount, recipient: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            amount,
            expected_recipient: recipient.into(),
            expected_sender: None,
            intent_id: None,
            max_tx_age_seconds: None,
            lookback_limit: None,
            allow_amount_greater_or_equal: true,
        }
    }
}

/// Outcome of a payment verification. A failed verification is a result,
/// not an error; backend failures surface as [`crate::MeshError`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Ok { tx: TxSummary },
    Failed { reason: VerifyFailReason },
}

impl VerifyOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerifyOutcome::Ok { .. })
    }

    pub fn failure_reason(&self) -> Option<VerifyFailReason> {
        match self {
            VerifyOutcome::Failed { reason } => Some(*reason),
            VerifyOutcome::Ok { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn intent_status_round_trips_through_strings() {
        for status in [
            IntentStatus::Pending,
            IntentStatus::Accepted,
            IntentStatus::Expired,
            IntentStatus::Settled,
        ] {
            let text = status.to_string();
            assert_eq!(IntentStatus::from_str(&text).unwrap(), status);
        }
        assert_eq!(IntentStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn verify_fail_reason_uses_snake_case() {
        assert_eq!(
            VerifyFailReason::TxNotFoundInRecentRecipientHistory.to_string(),
            "tx_not_found_in_recent_recipient_history"
        );
        assert_eq!(
            VerifyFailReason::from_str("sender_mismatch").unwrap(),
            VerifyFailReason::SenderMismatch
        );
    }

    #[test]
    fn offer_id_is_derived_from_intent_sender_and_time() {
        assert_eq!(Offer::derive_id("i1", "EQY", 1700000000), "i1:EQY:1700000000");
    }
}
