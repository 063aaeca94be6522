//! Policy Configuration
//!
//! Can be loaded from a config file or set at runtime.

use serde::{Deserialize, Serialize};

use super::types::CRITICAL_SCORE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// LOW windows without violations are only logged
    pub silent_clean: bool,
    /// HIGH windows at or above this score are Critical
    pub critical_score: f64,
    /// Apply the override rules in `rules.rs`
    pub enable_rules: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            silent_clean: true,
            critical_score: CRITICAL_SCORE,
            enable_rules: true,
        }
    }
}

impl PolicyConfig {
    /// Every window notifies, overrides on
    pub fn strict() -> Self {
        Self {
            silent_clean: false,
            ..Default::default()
        }
    }

    /// Risk level only, no overrides
    pub fn level_only() -> Self {
        Self {
            enable_rules: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PolicyConfig::default();
        assert!(config.silent_clean);
        assert!(config.enable_rules);
        assert_eq!(config.critical_score, 90.0);
    }

    #[test]
    fn test_presets() {
        assert!(!PolicyConfig::strict().silent_clean);
        assert!(!PolicyConfig::level_only().enable_rules);
    }
}
