// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire codec for the MESH protocol.
//!
//! One text line per message: `MESH: <json>`. Six kinds (beacon, intent,
//! offer, accept, settle, dispute), version `"1.0"`. [`codec::parse`]
//! tolerates arbitrary chat noise by returning `None`.

pub mod codec;
pub mod eta;
pub mod message;

pub use codec::{parse, serialize, WIRE_PREFIX};
pub use eta::parse_eta_seconds;
pub use message::{
    AcceptMsg, BeaconMsg, DisputeMsg, IntentMsg, MeshMessage, OfferMsg, SettleMsg,
};
