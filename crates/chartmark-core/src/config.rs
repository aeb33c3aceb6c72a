//! Engine configuration.

use crate::commands::DEFAULT_MAX_HISTORY;
use crate::geometry::{DEFAULT_HANDLE_TOLERANCE, DEFAULT_HIT_TOLERANCE};
use crate::shapes::ShapeStyle;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixels the pointer must move (strictly more) before a press becomes a drag.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 5.0;
/// Minimum spacing of unthrottled pointer moves (~60 Hz).
pub const DEFAULT_MOVE_THROTTLE_MS: f64 = 16.0;
/// Debounce between a change and the autosave that follows it.
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("invalid default style: {0}")]
    Style(#[from] crate::tools::ValidationError),
}

/// Tunables for a [`crate::engine::ChartEngine`]. Every field has a default,
/// so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Body hit tolerance in pixels.
    pub hit_tolerance: f64,
    /// Endpoint handle tolerance in pixels.
    pub handle_tolerance: f64,
    pub drag_threshold: f64,
    pub move_throttle_ms: f64,
    /// Undo steps kept before the oldest is dropped.
    pub max_history: usize,
    pub autosave_interval_ms: u64,
    /// Keep the drawing tool armed after a shape is finished.
    pub keep_tool_after_draw: bool,
    /// Style for new shapes when the caller gives none.
    pub default_style: ShapeStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            handle_tolerance: DEFAULT_HANDLE_TOLERANCE,
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            move_throttle_ms: DEFAULT_MOVE_THROTTLE_MS,
            max_history: DEFAULT_MAX_HISTORY,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            keep_tool_after_draw: false,
            default_style: ShapeStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("hit_tolerance", self.hit_tolerance)?;
        non_negative("handle_tolerance", self.handle_tolerance)?;
        non_negative("drag_threshold", self.drag_threshold)?;
        non_negative("move_throttle_ms", self.move_throttle_ms)?;
        if self.max_history == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_history",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        ToolRegistry::resolve_style(&self.default_style, None)?;
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "a finite number >= 0",
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"hit_tolerance": 6.0, "keep_tool_after_draw": true}"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert!((config.hit_tolerance - 6.0).abs() < f64::EPSILON);
        assert!(config.keep_tool_after_draw);
        assert!((config.handle_tolerance - DEFAULT_HANDLE_TOLERANCE).abs() < f64::EPSILON);
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let err = EngineConfig::from_json(r#"{"drag_threshold": -1.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "drag_threshold", .. }));
    }

    #[test]
    fn test_rejects_zero_history() {
        let config = EngineConfig {
            max_history: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_default_style() {
        let json = r#"{"default_style": {"color": ""}}"#;
        assert!(matches!(EngineConfig::from_json(json), Err(ConfigError::Style(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let back = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
