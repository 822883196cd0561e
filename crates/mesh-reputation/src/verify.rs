// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settlement-time payment verification.
//!
//! The canonical verifier scans the recipient's recent inbound transactions
//! and matches the claimed hash after normalization (hex or base64,
//! case-insensitive, left-padded to 32 bytes). The permissive verifier
//! accepts any non-empty hash and exists for demo/local runs only; strict
//! chain mode never constructs it.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use bigdecimal::BigDecimal;
use tracing::debug;

use mesh_core::time::now_ts;
use mesh_core::types::{TxSummary, VerifyFailReason, VerifyOutcome, VerifyRequest};
use mesh_core::{MeshError, PaymentVerifier, TransactionSource};

/// Default number of recent inbound transactions scanned per verification.
pub const DEFAULT_LOOKBACK: usize = 30;
/// Default maximum accepted transaction age, in seconds.
pub const DEFAULT_MAX_TX_AGE_SECONDS: i64 = 3600;

/// Normalize a transaction hash to its 32-byte form.
///
/// Accepts hex (with or without `0x`, case-insensitive) and base64
/// (standard or url-safe alphabets). Shorter inputs are left-padded with
/// zero bytes; anything that decodes to more than 32 bytes is rejected.
pub fn normalize_tx_hash(hash: &str) -> Option<[u8; 32]> {
    let trimmed = hash.trim();
    if trimmed.is_empty() {
        return None;
    }

    let hex_candidate = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = if hex_candidate.chars().all(|c| c.is_ascii_hexdigit()) {
        let padded = if hex_candidate.len() % 2 == 0 {
            hex_candidate.to_ascii_lowercase()
        } else {
            format!("0{}", hex_candidate.to_ascii_lowercase())
        };
        hex::decode(padded).ok()?
    } else {
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(trimmed))
            .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(trimmed))
            .ok()?
    };

    if bytes.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Some(out)
}

/// Canonical [`PaymentVerifier`]: recent-inbound scan over an injected
/// [`TransactionSource`].
pub struct RecentInboundVerifier {
    source: Arc<dyn TransactionSource>,
}

impl RecentInboundVerifier {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self { source }
    }

    fn fail(reason: VerifyFailReason) -> Result<VerifyOutcome, MeshError> {
        Ok(VerifyOutcome::Failed { reason })
    }
}

#[async_trait]
impl PaymentVerifier for RecentInboundVerifier {
    async fn verify_payment(&self, req: &VerifyRequest) -> Result<VerifyOutcome, MeshError> {
        if req.tx_hash.trim().is_empty() {
            return Self::fail(VerifyFailReason::MissingTxHash);
        }
        if req.expected_recipient.trim().is_empty() {
            return Self::fail(VerifyFailReason::MissingExpectedRecipient);
        }
        let Some(wanted) = normalize_tx_hash(&req.tx_hash) else {
            return Self::fail(VerifyFailReason::InvalidVerifyParams);
        };
        if req.amount < BigDecimal::from(0) {
            return Self::fail(VerifyFailReason::InvalidVerifyParams);
        }

        let lookback = req.lookback_limit.unwrap_or(DEFAULT_LOOKBACK);
        let recent = match self
            .source
            .recent_inbound(&req.expected_recipient, lookback)
            .await
        {
            Ok(txs) => txs,
            Err(e) => {
                debug!(error = %e, "transaction lookup failed");
                return Self::fail(VerifyFailReason::TxLookupFailed);
            }
        };

        let Some(tx) = recent
            .into_iter()
            .find(|tx| normalize_tx_hash(&tx.hash) == Some(wanted))
        else {
            return Self::fail(VerifyFailReason::TxNotFoundInRecentRecipientHistory);
        };

        let Some(sender) = tx.source.as_deref() else {
            return Self::fail(VerifyFailReason::TxHasNoInternalInbound);
        };
        if tx.destination != req.expected_recipient {
            return Self::fail(VerifyFailReason::RecipientMismatch);
        }
        if let Some(expected_sender) = req.expected_sender.as_deref() {
            if sender != expected_sender {
                return Self::fail(VerifyFailReason::SenderMismatch);
            }
        }

        let amount_ok = if req.allow_amount_greater_or_equal {
            tx.amount >= req.amount
        } else {
            tx.amount == req.amount
        };
        if !amount_ok {
            return Self::fail(VerifyFailReason::AmountMismatch);
        }

        let max_age = req.max_tx_age_seconds.unwrap_or(DEFAULT_MAX_TX_AGE_SECONDS);
        if now_ts() - tx.utime > max_age {
            return Self::fail(VerifyFailReason::TxTooOld);
        }

        if tx.aborted || tx.compute_failed {
            return Self::fail(VerifyFailReason::TxFailed);
        }

        Ok(VerifyOutcome::Ok { tx })
    }
}

/// Demo verifier: any non-empty hash passes. Forbidden under strict chain
/// mode; the facade never constructs it there.
pub struct PermissiveVerifier;

#[async_trait]
impl PaymentVerifier for PermissiveVerifier {
    async fn verify_payment(&self, req: &VerifyRequest) -> Result<VerifyOutcome, MeshError> {
        if req.tx_hash.trim().is_empty() {
            return Ok(VerifyOutcome::Failed {
                reason: VerifyFailReason::MissingTxHash,
            });
        }
        Ok(VerifyOutcome::Ok {
            tx: TxSummary {
                hash: req.tx_hash.clone(),
                source: req.expected_sender.clone(),
                destination: req.expected_recipient.clone(),
                amount: req.amount.clone(),
                utime: now_ts(),
                aborted: false,
                compute_failed: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tokio::sync::Mutex;

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    /// Scripted transaction source for the canonical verifier.
    struct ScriptedSource {
        txs: Mutex<Vec<TxSummary>>,
        fail_lookup: bool,
    }

    impl ScriptedSource {
        fn with(txs: Vec<TxSummary>) -> Arc<Self> {
            Arc::new(Self {
                txs: Mutex::new(txs),
                fail_lookup: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                txs: Mutex::new(Vec::new()),
                fail_lookup: true,
            })
        }
    }

    #[async_trait]
    impl TransactionSource for ScriptedSource {
        async fn recent_inbound(
            &self,
            _address: &str,
            limit: usize,
        ) -> Result<Vec<TxSummary>, MeshError> {
            if self.fail_lookup {
                return Err(MeshError::Chain {
                    message: "rpc unreachable".into(),
                    source: None,
                });
            }
            let txs = self.txs.lock().await;
            Ok(txs.iter().take(limit).cloned().collect())
        }
    }

    fn good_tx() -> TxSummary {
        TxSummary {
            hash: "0xABCDEF".to_string(),
            source: Some("EQX".to_string()),
            destination: "EQY".to_string(),
            amount: amount("0.75"),
            utime: now_ts() - 10,
            aborted: false,
            compute_failed: false,
        }
    }

    fn request() -> VerifyRequest {
        let mut req = VerifyRequest::new("0xabcdef", amount("0.75"), "EQY");
        req.expected_sender = Some("EQX".to_string());
        req
    }

    async fn verify(txs: Vec<TxSummary>, req: &VerifyRequest) -> VerifyOutcome {
        RecentInboundVerifier::new(ScriptedSource::with(txs))
            .verify_payment(req)
            .await
            .unwrap()
    }

    #[test]
    fn hash_normalization_accepts_hex_and_base64() {
        let from_hex = normalize_tx_hash(
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
        )
        .unwrap();
        let upper = normalize_tx_hash(
            "0x9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08",
        )
        .unwrap();
        let from_b64 = normalize_tx_hash("n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg=").unwrap();
        assert_eq!(from_hex, upper);
        assert_eq!(from_hex, from_b64);

        // Short hashes are left-padded.
        let short = normalize_tx_hash("0xabc").unwrap();
        assert_eq!(&short[..29], &[0u8; 29][..]);
        assert_eq!(&short[29..], &[0x00, 0x0a, 0xbc]);

        assert!(normalize_tx_hash("").is_none());
        assert!(normalize_tx_hash("!!not-a-hash!!").is_none());
    }

    #[tokio::test]
    async fn happy_path_matches_by_normalized_hash() {
        let outcome = verify(vec![good_tx()], &request()).await;
        match outcome {
            VerifyOutcome::Ok { tx } => assert_eq!(tx.destination, "EQY"),
            VerifyOutcome::Failed { reason } => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn missing_params_fail_before_lookup() {
        let verifier = RecentInboundVerifier::new(ScriptedSource::failing());

        let mut req = request();
        req.tx_hash = " ".into();
        assert_eq!(
            verifier.verify_payment(&req).await.unwrap().failure_reason(),
            Some(VerifyFailReason::MissingTxHash)
        );

        let mut req = request();
        req.expected_recipient = "".into();
        assert_eq!(
            verifier.verify_payment(&req).await.unwrap().failure_reason(),
            Some(VerifyFailReason::MissingExpectedRecipient)
        );

        let mut req = request();
        req.tx_hash = "!!not-a-hash!!".into();
        assert_eq!(
            verifier.verify_payment(&req).await.unwrap().failure_reason(),
            Some(VerifyFailReason::InvalidVerifyParams)
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_a_verify_failure_not_an_error() {
        let verifier = RecentInboundVerifier::new(ScriptedSource::failing());
        assert_eq!(
            verifier
                .verify_payment(&request())
                .await
                .unwrap()
                .failure_reason(),
            Some(VerifyFailReason::TxLookupFailed)
        );
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let mut req = request();
        req.tx_hash = "0x1234".into();
        assert_eq!(
            verify(vec![good_tx()], &req).await.failure_reason(),
            Some(VerifyFailReason::TxNotFoundInRecentRecipientHistory)
        );
    }

    #[tokio::test]
    async fn external_only_tx_is_rejected() {
        let mut tx = good_tx();
        tx.source = None;
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::TxHasNoInternalInbound)
        );
    }

    #[tokio::test]
    async fn recipient_and_sender_mismatches() {
        let mut tx = good_tx();
        tx.destination = "EQZ".into();
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::RecipientMismatch)
        );

        let mut tx = good_tx();
        tx.source = Some("EQW".into());
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::SenderMismatch)
        );
    }

    #[tokio::test]
    async fn amount_rules_follow_the_ge_flag() {
        let mut tx = good_tx();
        tx.amount = amount("0.80");
        assert!(verify(vec![tx.clone()], &request()).await.is_ok());

        let mut strict = request();
        strict.allow_amount_greater_or_equal = false;
        assert_eq!(
            verify(vec![tx], &strict).await.failure_reason(),
            Some(VerifyFailReason::AmountMismatch)
        );

        let mut tx = good_tx();
        tx.amount = amount("0.70");
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::AmountMismatch)
        );
    }

    #[tokio::test]
    async fn stale_and_failed_txs_are_rejected() {
        let mut tx = good_tx();
        tx.utime = now_ts() - 7200;
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::TxTooOld)
        );

        let mut tx = good_tx();
        tx.aborted = true;
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::TxFailed)
        );

        let mut tx = good_tx();
        tx.compute_failed = true;
        assert_eq!(
            verify(vec![tx], &request()).await.failure_reason(),
            Some(VerifyFailReason::TxFailed)
        );
    }

    #[tokio::test]
    async fn lookback_bounds_the_scan() {
        let mut txs: Vec<TxSummary> = (0..40)
            .map(|i| {
                let mut tx = good_tx();
                tx.hash = format!("{i:064x}");
                tx
            })
            .collect();
        let mut wanted = good_tx();
        wanted.hash = "0xabcdef".into();
        txs.push(wanted);

        // The matching tx sits past the default lookback of 30.
        assert_eq!(
            verify(txs, &request()).await.failure_reason(),
            Some(VerifyFailReason::TxNotFoundInRecentRecipientHistory)
        );
    }

    #[tokio::test]
    async fn permissive_verifier_accepts_any_non_empty_hash() {
        let verifier = PermissiveVerifier;
        assert!(verifier.verify_payment(&request()).await.unwrap().is_ok());

        let mut req = request();
        req.tx_hash = "".into();
        assert_eq!(
            verifier.verify_payment(&req).await.unwrap().failure_reason(),
            Some(VerifyFailReason::MissingTxHash)
        );
    }
}
