// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading for the MESH agent.

pub mod model;
pub mod validation;

use mesh_core::MeshError;

pub use model::{
    AgentConfig, ChainConfig, EngineConfig, MeshConfig, Mode, StorageConfig, TransportConfig,
};
pub use validation::validate;

/// Parse and validate a TOML configuration document.
pub fn load_from_str(text: &str) -> Result<MeshConfig, MeshError> {
    let config: MeshConfig =
        toml::from_str(text).map_err(|e| MeshError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Read, parse, and validate the configuration file at `path`.
pub fn load_from_path(path: &str) -> Result<MeshConfig, MeshError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| MeshError::Config(format!("cannot read {path}: {e}")))?;
    load_from_str(&text)
}
