// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the MESH coordination engine.

use thiserror::Error;

use crate::types::VerifyFailReason;

/// The primary error type used across all MESH adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed tool arguments (bad rating, non-finite fee, deadline out of range,
    /// oversize payload). No state change has occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// A precondition on existing state failed (intent not found, intent not
    /// pending, skill mismatch, reputation too low, budget too low).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Payment verification returned a negative result at settle time.
    #[error("payment verification failed: {reason}")]
    Verification { reason: VerifyFailReason },

    /// A settlement tx hash was already recorded for this executor.
    #[error("outcome replay detected for tx {tx_hash}")]
    Replay { tx_hash: String },

    /// Registration stake below the contract minimum.
    #[error("stake below minimum: {stake} < 1")]
    MinStakeViolation { stake: String },

    /// Strict chain mode is active and no on-chain path is available.
    #[error("chain_path_unavailable: {0}")]
    ChainUnavailable(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chain adapter errors (RPC failure, wrapper rejection).
    #[error("chain error: {message}")]
    Chain {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport errors, surfaced after the retry budget is exhausted.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MeshError {
    /// Shorthand for a storage error wrapping an arbitrary cause.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MeshError::Storage {
            source: Box::new(source),
        }
    }
}
