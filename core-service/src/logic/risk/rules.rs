//! HSE Rules & Thresholds
//!
//! Rule file schema and risk level thresholds.
//! No evaluation logic here - see `engine.rs`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::RiskLevel;
use crate::error::{CoreError, CoreResult};

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Score at or above this = HIGH
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;

/// Score at or above this = MEDIUM
pub const MEDIUM_RISK_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high_min: f64,
    pub medium_min: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_min: HIGH_RISK_THRESHOLD,
            medium_min: MEDIUM_RISK_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.high_min {
            RiskLevel::High
        } else if score >= self.medium_min {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "==" => Some(Operator::Eq),
            _ => None,
        }
    }

    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Eq => value == threshold,
        }
    }
}

// ============================================================================
// RULE FILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    /// Kept as text: an unknown operator makes the condition false
    pub operator: String,
    pub value: f64,
}

impl Condition {
    /// False when the feature is missing or the operator unknown
    pub fn holds(&self, feature_value: Option<f64>) -> bool {
        match (feature_value, Operator::parse(&self.operator)) {
            (Some(v), Some(op)) => op.apply(v, self.value),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpiCheck {
    pub feature: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HseRule {
    pub rule_id: String,
    pub name: String,
    pub activity_id: i64,
    pub severity: String,
    pub risk_weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: Recommendation,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// EPI name → check, evaluated only when the rule is violated
    #[serde(default)]
    pub epi_analysis: Option<BTreeMap<String, EpiCheck>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub rules: Vec<HseRule>,
}

impl RulesConfig {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded {} HSE rules from {}", config.rules.len(), path.display());
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.rule_id.as_str()) {
                return Err(CoreError::Config(format!("Duplicate rule_id: {}", rule.rule_id)));
            }
            if !rule.risk_weight.is_finite() {
                return Err(CoreError::Config(format!("Rule {} has a non-finite risk_weight", rule.rule_id)));
            }
            for cond in &rule.conditions {
                if Operator::parse(&cond.operator).is_none() {
                    log::warn!(
                        "Rule {}: unknown operator '{}' on {}, condition never holds",
                        rule.rule_id,
                        cond.operator,
                        cond.feature
                    );
                }
            }
        }
        Ok(())
    }

    pub fn rules_for_activity(&self, activity_id: i64) -> impl Iterator<Item = &HseRule> {
        self.rules.iter().filter(move |r| r.activity_id == activity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let t = RiskThresholds::default();
        assert_eq!(t.level_for(0.0), RiskLevel::Low);
        assert_eq!(t.level_for(29.9), RiskLevel::Low);
        assert_eq!(t.level_for(30.0), RiskLevel::Medium);
        assert_eq!(t.level_for(60.0), RiskLevel::High);
    }

    #[test]
    fn test_condition_operators() {
        let cond = |op: &str| Condition { feature: "x".into(), operator: op.into(), value: 1.0 };
        assert!(cond("<").holds(Some(0.5)));
        assert!(cond("<=").holds(Some(1.0)));
        assert!(cond(">").holds(Some(2.0)));
        assert!(cond(">=").holds(Some(1.0)));
        assert!(cond("==").holds(Some(1.0)));
        assert!(!cond("!=").holds(Some(0.0)));
        assert!(!cond("<").holds(None));
    }

    #[test]
    fn test_parse_minimal_rule() {
        let json = r#"{"rules": [{
            "rule_id": "R1", "name": "n", "activity_id": 2,
            "severity": "HIGH", "risk_weight": 40,
            "conditions": [{"feature": "helmet_compliance_ratio", "operator": "<", "value": 0.8}]
        }]}"#;
        let config = RulesConfig::from_json(json).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].recommendation.message, "");
        assert!(config.rules[0].epi_analysis.is_none());
        assert_eq!(config.rules_for_activity(2).count(), 1);
        assert_eq!(config.rules_for_activity(1).count(), 0);
    }

    #[test]
    fn test_duplicate_rule_id_rejected() {
        let json = r#"{"rules": [
            {"rule_id": "R1", "name": "a", "activity_id": 0, "severity": "LOW", "risk_weight": 1},
            {"rule_id": "R1", "name": "b", "activity_id": 0, "severity": "LOW", "risk_weight": 1}
        ]}"#;
        assert!(matches!(RulesConfig::from_json(json), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_shipped_rules_parse() {
        let config = RulesConfig::from_json(include_str!("../../../config/hse_rules.json")).unwrap();
        assert!(!config.rules.is_empty());
        for rule in &config.rules {
            assert!((0..=3).contains(&rule.activity_id), "{}", rule.rule_id);
            assert!(rule.conditions.iter().all(|c| Operator::parse(&c.operator).is_some()));
        }
    }
}
