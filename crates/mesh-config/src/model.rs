// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the MESH agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level MESH configuration.
///
/// Loaded from a TOML file; all sections are optional and default to
/// sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MeshConfig {
    /// Agent identity and bidding profile.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Group-chat transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Chain trust-mode settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Coordination engine knobs.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend selection.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Agent identity and bidding profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// The agent's chain address.
    #[serde(default)]
    pub address: String,

    /// Skills this agent advertises and auto-offers on.
    #[serde(default)]
    pub skills: Vec<String>,

    /// Minimum fee this agent bids.
    #[serde(default = "default_min_fee")]
    pub min_fee: BigDecimal,

    /// Stake registered on start (when auto-register is on).
    #[serde(default = "default_stake")]
    pub stake: BigDecimal,

    /// Display string advertised in beacons.
    #[serde(default = "default_response_time")]
    pub response_time: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            skills: Vec::new(),
            min_fee: default_min_fee(),
            stake: default_stake(),
            response_time: default_response_time(),
        }
    }
}

fn default_min_fee() -> BigDecimal {
    // 0.1
    BigDecimal::new(BigInt::from(1), 1)
}

fn default_stake() -> BigDecimal {
    BigDecimal::from(1)
}

fn default_response_time() -> String {
    "~1m".to_string()
}

/// Group-chat transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Telegram Bot API token. `None` disables the Telegram adapter.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// The coordination group every MESH message goes to.
    #[serde(default)]
    pub mesh_group_id: String,

    /// Optional direct channel advertised in beacons.
    #[serde(default)]
    pub reply_chat: Option<String>,

    /// Optional channel for operator notices (selection, disputes).
    #[serde(default)]
    pub operator_chat_id: Option<String>,
}

/// Operating mode; production and mainnet default to strict chain rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Testnet,
    Production,
    Mainnet,
}

impl Mode {
    pub fn defaults_to_strict(self) -> bool {
        matches!(self, Mode::Production | Mode::Mainnet)
    }
}

/// Chain trust-mode configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Reputation contract address, for the host adapter's benefit.
    #[serde(default)]
    pub contract_address: Option<String>,

    #[serde(default)]
    pub mode: Mode,

    /// Explicit override of the mode-derived strict gate.
    #[serde(default)]
    pub strict_chain: Option<bool>,

    /// Permit the in-process reputation ledger when no host adapter is
    /// injected. Must be false in production.
    #[serde(default = "default_true")]
    pub allow_local_reputation_fallback: bool,

    /// Register and broadcast a beacon on engine start.
    #[serde(default)]
    pub auto_register_on_start: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            mode: Mode::default(),
            strict_chain: None,
            allow_local_reputation_fallback: true,
            auto_register_on_start: false,
        }
    }
}

impl ChainConfig {
    /// The single authoritative verification gate.
    pub fn strict_chain(&self) -> bool {
        self.strict_chain.unwrap_or_else(|| self.mode.defaults_to_strict())
    }
}

fn default_true() -> bool {
    true
}

/// Coordination engine knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Defer winner selection until the intent deadline.
    #[serde(default = "default_true")]
    pub wait_for_deadline: bool,

    #[serde(default = "default_true")]
    pub enable_scheduler: bool,

    /// Scheduler tick interval; clamped to a 250 ms floor at validation.
    #[serde(default = "default_scheduler_interval_ms")]
    pub scheduler_interval_ms: u64,

    /// Minimum spacing between lazy expiry sweeps.
    #[serde(default = "default_expiry_sweep_interval_ms")]
    pub expiry_sweep_interval_ms: u64,

    /// Beacon rebroadcast period.
    #[serde(default = "default_beacon_refresh_seconds")]
    pub beacon_refresh_seconds: u64,

    /// Extra send attempts after the first failure.
    #[serde(default = "default_send_retries")]
    pub send_retries: u32,

    /// Base backoff for send retries; 50 ms floor.
    #[serde(default = "default_send_retry_base_ms")]
    pub send_retry_base_ms: u64,

    /// Horizon for intent deadlines.
    #[serde(default = "default_max_intent_deadline_seconds")]
    pub max_intent_deadline_seconds: i64,

    /// Cap on the serialized intent payload.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Ranking weight on normalized reputation.
    #[serde(default = "default_weight_reputation")]
    pub rank_weight_reputation: f64,

    /// Ranking weight on normalized (inverted) fee.
    #[serde(default = "default_weight_fee")]
    pub rank_weight_fee: f64,

    /// Ranking weight on normalized speed.
    #[serde(default = "default_weight_speed")]
    pub rank_weight_speed: f64,

    /// Score window in which stake age breaks ties.
    #[serde(default = "default_tie_window")]
    pub tie_window: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait_for_deadline: true,
            enable_scheduler: true,
            scheduler_interval_ms: default_scheduler_interval_ms(),
            expiry_sweep_interval_ms: default_expiry_sweep_interval_ms(),
            beacon_refresh_seconds: default_beacon_refresh_seconds(),
            send_retries: default_send_retries(),
            send_retry_base_ms: default_send_retry_base_ms(),
            max_intent_deadline_seconds: default_max_intent_deadline_seconds(),
            max_payload_bytes: default_max_payload_bytes(),
            rank_weight_reputation: default_weight_reputation(),
            rank_weight_fee: default_weight_fee(),
            rank_weight_speed: default_weight_speed(),
            tie_window: default_tie_window(),
        }
    }
}

fn default_scheduler_interval_ms() -> u64 {
    1000
}

fn default_expiry_sweep_interval_ms() -> u64 {
    1000
}

fn default_beacon_refresh_seconds() -> u64 {
    300
}

fn default_send_retries() -> u32 {
    2
}

fn default_send_retry_base_ms() -> u64 {
    150
}

fn default_max_intent_deadline_seconds() -> i64 {
    3600
}

fn default_max_payload_bytes() -> usize {
    16 * 1024
}

fn default_weight_reputation() -> f64 {
    0.5
}

fn default_weight_fee() -> f64 {
    0.3
}

fn default_weight_speed() -> f64 {
    0.2
}

fn default_tie_window() -> f64 {
    0.05
}

/// Storage backend selection: a SQLite path, a REST endpoint pair, or —
/// with neither — the in-memory store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub database_path: Option<String>,

    #[serde(default)]
    pub supabase_url: Option<String>,

    #[serde(default)]
    pub supabase_service_role_key: Option<String>,
}
