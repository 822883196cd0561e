// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The six MESH message kinds.
//!
//! Every message carries a protocol version `v` (default `"1.0"`) and a
//! `type` tag. Field names on the wire are camelCase. Unknown fields are
//! dropped by deserialization, so reserializing a parsed message yields the
//! sanitized form.

use mesh_core::types::{Amount, DealOutcome};
use serde::{Deserialize, Serialize};

pub(crate) fn default_version() -> String {
    "1.0".to_string()
}

fn default_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Periodic self-advertisement carrying skills, stake, and fee preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub from: String,
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_fee: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_chat: Option<String>,
}

/// A work request open for bidding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub id: String,
    pub from: String,
    pub skill: String,
    pub budget: Amount,
    pub deadline: i64,
    pub min_reputation: i64,
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
}

/// A bid against an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub intent_id: String,
    pub from: String,
    pub fee: Amount,
    pub eta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow_address: Option<String>,
}

/// Winner announcement from the intent creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub intent_id: String,
    pub from: String,
    pub to: String,
    pub fee: Amount,
    /// Filled with the receiver's clock when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_at: Option<i64>,
}

/// Settlement report from the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub intent_id: String,
    pub from: String,
    pub tx_hash: String,
    pub outcome: DealOutcome,
    pub rating: i64,
}

/// A challenge against a counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeMsg {
    #[serde(default = "default_version")]
    pub v: String,
    pub intent_id: String,
    pub from: String,
    pub against: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_tx: Option<String>,
}

/// A parsed MESH message. The `type` tag selects the kind; an unknown tag
/// fails deserialization and the line is treated as protocol noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeshMessage {
    Beacon(BeaconMsg),
    Intent(IntentMsg),
    Offer(OfferMsg),
    Accept(AcceptMsg),
    Settle(SettleMsg),
    Dispute(DisputeMsg),
}

impl MeshMessage {
    /// The wire tag, for logging and dedup metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshMessage::Beacon(_) => "beacon",
            MeshMessage::Intent(_) => "intent",
            MeshMessage::Offer(_) => "offer",
            MeshMessage::Accept(_) => "accept",
            MeshMessage::Settle(_) => "settle",
            MeshMessage::Dispute(_) => "dispute",
        }
    }

    /// The sender address common to every kind.
    pub fn from_address(&self) -> &str {
        match self {
            MeshMessage::Beacon(m) => &m.from,
            MeshMessage::Intent(m) => &m.from,
            MeshMessage::Offer(m) => &m.from,
            MeshMessage::Accept(m) => &m.from,
            MeshMessage::Settle(m) => &m.from,
            MeshMessage::Dispute(m) => &m.from,
        }
    }
}
