// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transaction source for settlement tests.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::Mutex;

use mesh_core::time::now_ts;
use mesh_core::types::{Amount, TxSummary};
use mesh_core::{MeshError, TransactionSource};

/// A fake chain whose recent-inbound history is scripted by the test.
#[derive(Default)]
pub struct MockChain {
    txs: Mutex<Vec<TxSummary>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound transfer as seen by the verifier scan.
    pub async fn add_inbound(&self, tx: TxSummary) {
        self.txs.lock().await.push(tx);
    }

    /// Convenience: a fresh, successful inbound payment.
    pub fn payment(hash: &str, from: &str, to: &str, amount: Amount) -> TxSummary {
        TxSummary {
            hash: hash.to_string(),
            source: Some(from.to_string()),
            destination: to.to_string(),
            amount,
            utime: now_ts(),
            aborted: false,
            compute_failed: false,
        }
    }
}

#[async_trait]
impl TransactionSource for MockChain {
    async fn recent_inbound(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TxSummary>, MeshError> {
        let txs = self.txs.lock().await;
        Ok(txs
            .iter()
            .rev()
            .filter(|tx| tx.destination == address)
            .take(limit)
            .cloned()
            .collect())
    }
}
