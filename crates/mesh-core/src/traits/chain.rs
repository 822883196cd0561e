// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chain-facing traits: the reputation/stake backend, the payment verifier,
//! and the transaction source the canonical verifier scans.

use async_trait::async_trait;

use crate::error::MeshError;
use crate::types::{Amount, SlashResult, StakeInfo, TxSummary, VerifyOutcome, VerifyRequest};

/// Reputation and stake operations, backed either by a host-injected
/// on-chain wrapper or by the bounded local ledger.
///
/// The local ledger's semantics are the reference contract; host adapters
/// are expected to verify against the same behavior.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Register (or re-stake) an agent. Requires `stake >= 1`; the first
    /// registration seeds the score at 100 and starts the stake-age clock,
    /// later calls overwrite the stake only.
    async fn register_agent(&self, address: &str, stake: &Amount) -> Result<(), MeshError>;

    /// Current score; `None` when the address has never registered.
    async fn get_reputation(&self, address: &str) -> Result<Option<i64>, MeshError>;

    async fn get_stake_info(&self, address: &str) -> Result<StakeInfo, MeshError>;

    /// Apply a settlement outcome to the executor's score. A `tx_hash`
    /// already seen for the same executor is a replay and must be rejected
    /// with [`MeshError::Replay`], leaving the score unchanged. Returns the
    /// new score.
    async fn record_outcome(
        &self,
        executor: &str,
        tx_hash: &str,
        rating: i64,
    ) -> Result<i64, MeshError>;

    /// Slash 20% of the offender's stake and 50 reputation points, both
    /// floored at zero.
    async fn slash(&self, offender: &str, reason: &str) -> Result<SlashResult, MeshError>;

    /// Withdraw the full stake; the agent is forgotten and scores as zero
    /// thereafter.
    async fn withdraw_stake(&self, address: &str) -> Result<Amount, MeshError>;
}

/// Settlement-time payment verification.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify_payment(&self, req: &VerifyRequest) -> Result<VerifyOutcome, MeshError>;
}

/// Read access to an address's recent inbound transactions; the canonical
/// verifier scans this to locate the settlement payment.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn recent_inbound(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TxSummary>, MeshError>;
}
