// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup validation of the loaded configuration.

use bigdecimal::BigDecimal;
use mesh_core::MeshError;

use crate::model::MeshConfig;

/// Floor on the scheduler tick interval.
pub const MIN_SCHEDULER_INTERVAL_MS: u64 = 250;
/// Floor on the send-retry base backoff.
pub const MIN_SEND_RETRY_BASE_MS: u64 = 50;

/// Validate cross-field constraints the serde model cannot express.
pub fn validate(config: &MeshConfig) -> Result<(), MeshError> {
    if config.chain.strict_chain() && config.chain.allow_local_reputation_fallback {
        return Err(MeshError::Config(
            "chain.allow_local_reputation_fallback must be false under strict chain mode"
                .to_string(),
        ));
    }

    if config.engine.scheduler_interval_ms < MIN_SCHEDULER_INTERVAL_MS {
        return Err(MeshError::Config(format!(
            "engine.scheduler_interval_ms must be at least {MIN_SCHEDULER_INTERVAL_MS}"
        )));
    }

    if config.engine.send_retry_base_ms < MIN_SEND_RETRY_BASE_MS {
        return Err(MeshError::Config(format!(
            "engine.send_retry_base_ms must be at least {MIN_SEND_RETRY_BASE_MS}"
        )));
    }

    if config.engine.max_payload_bytes == 0 {
        return Err(MeshError::Config(
            "engine.max_payload_bytes must be positive".to_string(),
        ));
    }

    if config.engine.max_intent_deadline_seconds <= 0 {
        return Err(MeshError::Config(
            "engine.max_intent_deadline_seconds must be positive".to_string(),
        ));
    }

    for (name, weight) in [
        ("rank_weight_reputation", config.engine.rank_weight_reputation),
        ("rank_weight_fee", config.engine.rank_weight_fee),
        ("rank_weight_speed", config.engine.rank_weight_speed),
        ("tie_window", config.engine.tie_window),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            return Err(MeshError::Config(format!(
                "engine.{name} must be a non-negative finite number"
            )));
        }
    }

    if config.agent.min_fee < BigDecimal::from(0) {
        return Err(MeshError::Config(
            "agent.min_fee must be non-negative".to_string(),
        ));
    }

    match (
        &config.storage.supabase_url,
        &config.storage.supabase_service_role_key,
    ) {
        (Some(_), None) | (None, Some(_)) => {
            return Err(MeshError::Config(
                "storage.supabase_url and storage.supabase_service_role_key go together"
                    .to_string(),
            ));
        }
        (Some(_), Some(_)) if config.storage.database_path.is_some() => {
            return Err(MeshError::Config(
                "configure either storage.database_path or the supabase pair, not both"
                    .to_string(),
            ));
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;

    #[test]
    fn default_config_validates() {
        validate(&MeshConfig::default()).unwrap();
    }

    #[test]
    fn production_rejects_local_fallback() {
        let mut config = MeshConfig::default();
        config.chain.mode = Mode::Production;
        assert!(validate(&config).is_err());

        config.chain.allow_local_reputation_fallback = false;
        validate(&config).unwrap();
    }

    #[test]
    fn strict_override_wins_over_mode() {
        let mut config = MeshConfig::default();
        config.chain.mode = Mode::Mainnet;
        config.chain.strict_chain = Some(false);
        // Not strict despite mainnet, so local fallback is fine.
        validate(&config).unwrap();
    }

    #[test]
    fn scheduler_interval_floor() {
        let mut config = MeshConfig::default();
        config.engine.scheduler_interval_ms = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn send_retry_base_floor() {
        let mut config = MeshConfig::default();
        config.engine.send_retry_base_ms = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn storage_backends_are_exclusive() {
        let mut config = MeshConfig::default();
        config.storage.supabase_url = Some("https://x.supabase.co".into());
        assert!(validate(&config).is_err(), "key missing");

        config.storage.supabase_service_role_key = Some("svc".into());
        validate(&config).unwrap();

        config.storage.database_path = Some("mesh.db".into());
        assert!(validate(&config).is_err(), "both backends configured");
    }
}
