// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform reputation facade over the host chain adapter and the local
//! ledger, with trust-mode gating.
//!
//! Resolution per operation: a host adapter always wins; without one the
//! local ledger serves as fallback unless it is disabled or the operation
//! mutates chain state under strict mode. `strict_chain` is the single
//! authoritative gate; `mode` only supplies its default upstream.

use std::sync::Arc;

use tracing::warn;

use mesh_core::types::{Amount, SlashResult, StakeInfo, VerifyFailReason, VerifyOutcome, VerifyRequest};
use mesh_core::{ChainBackend, MeshError, PaymentVerifier, TransactionSource};

use crate::local::LocalLedger;
use crate::verify::{PermissiveVerifier, RecentInboundVerifier};

/// Host-injected chain plumbing. All fields optional; whatever is missing
/// falls back per the trust rules.
#[derive(Default, Clone)]
pub struct HostAdapters {
    /// On-chain reputation/stake wrapper.
    pub backend: Option<Arc<dyn ChainBackend>>,
    /// Full payment verifier; overrides the canonical scan when present.
    pub verifier: Option<Arc<dyn PaymentVerifier>>,
    /// Chain read access for the canonical recent-inbound scan.
    pub tx_source: Option<Arc<dyn TransactionSource>>,
}

/// Trust-mode settings resolved by configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrustSettings {
    pub strict_chain: bool,
    pub allow_local_fallback: bool,
}

/// The uniform reputation/verification client handed to the coordinator.
pub struct ReputationClient {
    host: Option<Arc<dyn ChainBackend>>,
    local: Arc<LocalLedger>,
    verifier: Arc<dyn PaymentVerifier>,
    /// Present only when verification would otherwise be impossible under
    /// strict mode; `None` there makes verify fail closed.
    verifier_available: bool,
    trust: TrustSettings,
}

impl ReputationClient {
    pub fn new(trust: TrustSettings, adapters: HostAdapters) -> Self {
        let (verifier, verifier_available): (Arc<dyn PaymentVerifier>, bool) =
            if let Some(host_verifier) = adapters.verifier {
                (host_verifier, true)
            } else if let Some(tx_source) = adapters.tx_source {
                (Arc::new(RecentInboundVerifier::new(tx_source)), true)
            } else if trust.strict_chain {
                // Strict mode forbids the permissive fallback; keep a
                // placeholder and fail closed in verify_payment.
                (Arc::new(PermissiveVerifier), false)
            } else {
                warn!("no payment verification path injected; using permissive demo verifier");
                (Arc::new(PermissiveVerifier), true)
            };

        Self {
            host: adapters.backend,
            local: Arc::new(LocalLedger::new()),
            verifier,
            verifier_available,
            trust,
        }
    }

    /// Backend for chain-mutating operations.
    fn mutating_backend(&self) -> Result<&dyn ChainBackend, MeshError> {
        if let Some(host) = &self.host {
            return Ok(host.as_ref());
        }
        if self.trust.strict_chain {
            return Err(MeshError::ChainUnavailable(
                "strict chain mode with no host adapter".into(),
            ));
        }
        if !self.trust.allow_local_fallback {
            return Err(MeshError::ChainUnavailable(
                "local reputation fallback disabled".into(),
            ));
        }
        Ok(self.local.as_ref())
    }

    /// Backend for read operations; reads may use the local ledger even
    /// under strict mode, as long as fallback is allowed at all.
    fn reading_backend(&self) -> Result<&dyn ChainBackend, MeshError> {
        if let Some(host) = &self.host {
            return Ok(host.as_ref());
        }
        if !self.trust.allow_local_fallback {
            return Err(MeshError::ChainUnavailable(
                "local reputation fallback disabled".into(),
            ));
        }
        Ok(self.local.as_ref())
    }

    pub async fn register_agent(&self, address: &str, stake: &Amount) -> Result<(), MeshError> {
        self.mutating_backend()?.register_agent(address, stake).await
    }

    pub async fn get_reputation(&self, address: &str) -> Result<Option<i64>, MeshError> {
        self.reading_backend()?.get_reputation(address).await
    }

    pub async fn get_stake_info(&self, address: &str) -> Result<StakeInfo, MeshError> {
        self.reading_backend()?.get_stake_info(address).await
    }

    pub async fn record_outcome(
        &self,
        executor: &str,
        tx_hash: &str,
        rating: i64,
    ) -> Result<i64, MeshError> {
        self.mutating_backend()?
            .record_outcome(executor, tx_hash, rating)
            .await
    }

    pub async fn slash(&self, offender: &str, reason: &str) -> Result<SlashResult, MeshError> {
        self.mutating_backend()?.slash(offender, reason).await
    }

    pub async fn withdraw_stake(&self, address: &str) -> Result<Amount, MeshError> {
        self.mutating_backend()?.withdraw_stake(address).await
    }

    pub async fn verify_payment(&self, req: &VerifyRequest) -> Result<VerifyOutcome, MeshError> {
        if !self.verifier_available {
            return Ok(VerifyOutcome::Failed {
                reason: VerifyFailReason::TxLookupFailed,
            });
        }
        self.verifier.verify_payment(req).await
    }
}
