//! Shell configuration.

use crate::error::AppError;
use chartmark_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine tunables plus where the native shell keeps drawings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Directory for saved drawings; the platform data dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)?;
        config.engine.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        log::info!("Loaded config from {}", path.display());
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let json = r#"{"engine":{"hit_tolerance":6.0},"storageDir":"/tmp/charts"}"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.engine.hit_tolerance, 6.0);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/charts")));
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let result = AppConfig::from_json(r#"{"engine":{"max_history":0}}"#);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
