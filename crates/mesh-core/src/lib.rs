// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types, errors, and adapter traits for the MESH coordination engine.
//!
//! Everything that crosses a component boundary lives here: the domain
//! entities (peers, intents, offers, deals), the workspace error type, and
//! the traits behind which the storage, transport, and chain backends sit.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::MeshError;
pub use traits::{ChainBackend, PaymentVerifier, Store, TransactionSource, Transport, TransportEvent};
pub use types::{
    AcceptOutcome, Amount, Deal, DealOutcome, Intent, IntentStatus, Offer, Peer,
    ProcessedMessage, SlashResult, StakeInfo, TxSummary, VerifyFailReason, VerifyOutcome,
    VerifyRequest,
};
