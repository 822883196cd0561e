// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The MESH coordination engine.
//!
//! [`coordinator::Coordinator`] carries the ingest pipeline and the tool
//! surface, [`rank`] the deterministic selection, [`scheduler`] the
//! deadline sweep, [`transport::TransportFacade`] retrying sends, and
//! [`engine::Engine`] the lifecycle that ties them to a configured store
//! and reputation client.

pub mod coordinator;
pub mod engine;
pub mod rank;
pub mod scheduler;
pub mod transport;

pub use coordinator::{AgentProfile, Coordinator, IngestOutcome, SelectionOutcome};
pub use engine::Engine;
pub use rank::{rank_offers, select_best, RankWeights, RankedOffer};
pub use transport::TransportFacade;
