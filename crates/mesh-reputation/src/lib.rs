// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reputation client for the MESH coordination engine.
//!
//! A uniform facade ([`ReputationClient`]) over two [`mesh_core::ChainBackend`]
//! paths — the host-injected on-chain wrapper and the bounded in-process
//! ledger — plus the settlement-time payment verifiers. Trust-mode gating
//! decides which path each operation may take.

pub mod client;
pub mod local;
pub mod verify;

pub use client::{HostAdapters, ReputationClient, TrustSettings};
pub use local::LocalLedger;
pub use verify::{
    normalize_tx_hash, PermissiveVerifier, RecentInboundVerifier, DEFAULT_LOOKBACK,
    DEFAULT_MAX_TX_AGE_SECONDS,
};
