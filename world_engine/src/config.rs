//! Engine configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Tuning knobs for the trigger scheduler and the world state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum depth of forced consequence cascades within one tick.
    pub max_cascade_depth: u32,

    /// Seed for the default dice roller. `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    pub trend: TrendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 8,
            rng_seed: None,
            trend: TrendConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Parameters of trend classification and linear projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Points per day a `moderate` trend moves an attribute.
    pub base_rate: f64,
    pub slow_multiplier: f64,
    pub moderate_multiplier: f64,
    pub fast_multiplier: f64,
    /// Deltas of at least this size count as a moderate trend.
    pub moderate_threshold: f64,
    /// Deltas of at least this size count as a fast trend.
    pub fast_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.1,
            slow_multiplier: 0.5,
            moderate_multiplier: 1.0,
            fast_multiplier: 2.0,
            moderate_threshold: 5.0,
            fast_threshold: 15.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_cascade_depth, 8);
        assert_eq!(config.trend.base_rate, 0.1);
        assert_eq!(config.trend.fast_multiplier, 2.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_cascade_depth = 4
            rng_seed = 7

            [trend]
            fast_threshold = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.max_cascade_depth, 4);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.trend.fast_threshold, 20.0);
        assert_eq!(config.trend.moderate_threshold, 5.0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml_str("max_cascade_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.toml").unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
