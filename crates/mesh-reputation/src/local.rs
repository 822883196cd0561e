// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-process reputation ledger.
//!
//! The fallback behind [`crate::ReputationClient`] when no host chain
//! adapter is injected, and the reference semantics the conformance of any
//! host adapter is judged against. All state is owned by the instance; the
//! engine never holds module-level score or tx-seen caches.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::Mutex;

use mesh_core::time::now_ts;
use mesh_core::types::{Amount, SlashResult, StakeInfo};
use mesh_core::{ChainBackend, MeshError};

/// Score granted on first registration.
const INITIAL_SCORE: i64 = 100;
/// Reputation penalty applied by a slash.
const SLASH_REPUTATION_PENALTY: i64 = 50;

#[derive(Default)]
struct LedgerState {
    scores: HashMap<String, i64>,
    stakes: HashMap<String, Amount>,
    stake_since: HashMap<String, i64>,
    /// Settlement tx hashes already applied, per executor.
    tx_seen: HashMap<String, HashSet<String>>,
}

/// In-memory [`ChainBackend`] with the reference scoring semantics.
#[derive(Default)]
pub struct LocalLedger {
    state: Mutex<LedgerState>,
}

impl LocalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The score delta for a settlement rating.
    fn outcome_delta(rating: i64) -> i64 {
        match rating {
            r if r >= 9 => 15,
            r if r >= 7 => 8,
            r if r >= 5 => 2,
            r if r >= 3 => -10,
            _ => -25,
        }
    }
}

#[async_trait]
impl ChainBackend for LocalLedger {
    async fn register_agent(&self, address: &str, stake: &Amount) -> Result<(), MeshError> {
        if stake < &BigDecimal::from(1) {
            return Err(MeshError::MinStakeViolation {
                stake: stake.to_string(),
            });
        }
        let mut state = self.state.lock().await;
        if !state.scores.contains_key(address) {
            state.scores.insert(address.to_string(), INITIAL_SCORE);
            state.stake_since.insert(address.to_string(), now_ts());
        }
        state.stakes.insert(address.to_string(), stake.clone());
        Ok(())
    }

    async fn get_reputation(&self, address: &str) -> Result<Option<i64>, MeshError> {
        Ok(self.state.lock().await.scores.get(address).copied())
    }

    async fn get_stake_info(&self, address: &str) -> Result<StakeInfo, MeshError> {
        let state = self.state.lock().await;
        let stake = state
            .stakes
            .get(address)
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(0));
        let since = state.stake_since.get(address).copied().unwrap_or(0);
        let age_seconds = if since > 0 { (now_ts() - since).max(0) } else { 0 };
        Ok(StakeInfo {
            stake,
            since,
            age_seconds,
        })
    }

    async fn record_outcome(
        &self,
        executor: &str,
        tx_hash: &str,
        rating: i64,
    ) -> Result<i64, MeshError> {
        let mut state = self.state.lock().await;
        let seen = state.tx_seen.entry(executor.to_string()).or_default();
        if !seen.insert(tx_hash.to_string()) {
            return Err(MeshError::Replay {
                tx_hash: tx_hash.to_string(),
            });
        }

        let prior = state.scores.get(executor).copied().unwrap_or(0);
        let score = (prior + Self::outcome_delta(rating)).max(0);
        state.scores.insert(executor.to_string(), score);
        Ok(score)
    }

    async fn slash(&self, offender: &str, _reason: &str) -> Result<SlashResult, MeshError> {
        let mut state = self.state.lock().await;
        let stake = state
            .stakes
            .get(offender)
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(0));

        // 20% of the stake.
        let slashed_stake = &stake / BigDecimal::from(5);
        let mut remaining = &stake - &slashed_stake;
        if remaining < BigDecimal::from(0) {
            remaining = BigDecimal::from(0);
        }
        state.stakes.insert(offender.to_string(), remaining.clone());

        let reputation = (state.scores.get(offender).copied().unwrap_or(0)
            - SLASH_REPUTATION_PENALTY)
            .max(0);
        state.scores.insert(offender.to_string(), reputation);

        Ok(SlashResult {
            slashed_stake,
            remaining_stake: remaining,
            reputation,
        })
    }

    async fn withdraw_stake(&self, address: &str) -> Result<Amount, MeshError> {
        let mut state = self.state.lock().await;
        let prior = state
            .stakes
            .remove(address)
            .unwrap_or_else(|| BigDecimal::from(0));
        state.scores.remove(address);
        state.stake_since.remove(address);
        Ok(prior)
    }
}
