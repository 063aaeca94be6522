//! HSE Rule Engine
//!
//! Input: window features + predicted activity
//! Output: RiskAssessment (violations, missing EPI, score, level)
//!
//! Deterministic and explainable: every point of the score comes from a
//! named rule.

use std::collections::BTreeSet;

use super::rules::{HseRule, RiskThresholds, RulesConfig};
use super::types::{RiskAssessment, ViolatedRule};
use crate::logic::features::FeatureLookup;

#[derive(Debug, Clone, Default)]
pub struct HseRuleEngine {
    config: RulesConfig,
    thresholds: RiskThresholds,
}

impl HseRuleEngine {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            config,
            thresholds: RiskThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn rule_count(&self) -> usize {
        self.config.rules.len()
    }

    pub fn evaluate<L: FeatureLookup + ?Sized>(&self, features: &L, activity_id: i64) -> RiskAssessment {
        let mut violated_rules = Vec::new();
        let mut missing_epi = BTreeSet::new();
        let mut risk_score = 0.0;

        for rule in self.config.rules_for_activity(activity_id) {
            if !conditions_met(rule, features) {
                continue;
            }

            let violated = violation(rule, features);
            missing_epi.extend(violated.missing_epi.iter().cloned());
            risk_score += rule.risk_weight;

            log::debug!("Rule {} violated (+{})", rule.rule_id, rule.risk_weight);
            violated_rules.push(violated);
        }

        RiskAssessment {
            activity_id,
            violated_rules,
            missing_epi: missing_epi.into_iter().collect(),
            risk_score,
            risk_level: self.thresholds.level_for(risk_score),
        }
    }
}

fn conditions_met<L: FeatureLookup + ?Sized>(rule: &HseRule, features: &L) -> bool {
    rule.conditions
        .iter()
        .all(|cond| cond.holds(features.feature(&cond.feature)))
}

fn violation<L: FeatureLookup + ?Sized>(rule: &HseRule, features: &L) -> ViolatedRule {
    let missing_epi = rule
        .epi_analysis
        .iter()
        .flatten()
        .filter(|(_, check)| {
            features
                .feature(&check.feature)
                .is_some_and(|v| v < check.threshold)
        })
        .map(|(name, _)| format!("{} probably missing", name))
        .collect();

    ViolatedRule {
        rule_id: rule.rule_id.clone(),
        name: rule.name.clone(),
        severity: rule.severity.clone(),
        risk_weight: rule.risk_weight,
        description: rule.description.clone(),
        recommendation: rule.recommendation.message.clone(),
        missing_epi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::risk::RiskLevel;
    use std::collections::HashMap;

    const RULES: &str = r#"{"rules": [
        {
            "rule_id": "HSE-001", "name": "No helmet during manual work",
            "activity_id": 2, "severity": "HIGH", "risk_weight": 40,
            "description": "Workers without helmet",
            "recommendation": {"message": "Stop work and equip helmets"},
            "conditions": [{"feature": "helmet_compliance_ratio", "operator": "<", "value": 0.8}],
            "epi_analysis": {
                "helmet": {"feature": "helmet_compliance_ratio", "threshold": 0.8},
                "vest": {"feature": "vest_compliance_ratio", "threshold": 0.8}
            }
        },
        {
            "rule_id": "HSE-002", "name": "Too close to machine",
            "activity_id": 2, "severity": "MEDIUM", "risk_weight": 25,
            "conditions": [
                {"feature": "min_person_machine_distance", "operator": "<=", "value": 150},
                {"feature": "co_presence_person_machine", "operator": ">", "value": 0}
            ],
            "epi_analysis": {"helmet": {"feature": "helmet_compliance_ratio", "threshold": 0.8}}
        },
        {
            "rule_id": "HSE-010", "name": "Machine rule",
            "activity_id": 3, "severity": "HIGH", "risk_weight": 70,
            "conditions": [{"feature": "machine_presence_ratio", "operator": ">=", "value": 0}]
        }
    ]}"#;

    fn engine() -> HseRuleEngine {
        HseRuleEngine::new(RulesConfig::from_json(RULES).unwrap())
    }

    fn features(values: &[(&str, f64)]) -> HashMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_no_violation_is_low() {
        let f = features(&[("helmet_compliance_ratio", 1.0)]);
        let a = engine().evaluate(&f, 2);
        assert!(!a.has_violations());
        assert_eq!(a.risk_score, 0.0);
        assert_eq!(a.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_scores_sum_and_missing_epi_deduplicated() {
        let f = features(&[
            ("helmet_compliance_ratio", 0.2),
            ("vest_compliance_ratio", 1.0),
            ("min_person_machine_distance", 90.0),
            ("co_presence_person_machine", 0.5),
        ]);
        let a = engine().evaluate(&f, 2);
        assert_eq!(a.rule_ids(), vec!["HSE-001", "HSE-002"]);
        assert_eq!(a.risk_score, 65.0);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.missing_epi, vec!["helmet probably missing".to_string()]);
        assert_eq!(a.violated_rules[0].recommendation, "Stop work and equip helmets");
    }

    #[test]
    fn test_missing_feature_fails_condition() {
        // HSE-002 needs co_presence_person_machine
        let f = features(&[("helmet_compliance_ratio", 0.5), ("min_person_machine_distance", 10.0)]);
        let a = engine().evaluate(&f, 2);
        assert_eq!(a.rule_ids(), vec!["HSE-001"]);
        assert_eq!(a.risk_level, RiskLevel::Medium);
        // vest feature absent: not reported
        assert_eq!(a.violated_rules[0].missing_epi, vec!["helmet probably missing".to_string()]);
    }

    #[test]
    fn test_other_activities_skipped() {
        let f = features(&[("helmet_compliance_ratio", 0.0), ("machine_presence_ratio", 1.0)]);
        let a = engine().evaluate(&f, 3);
        assert_eq!(a.rule_ids(), vec!["HSE-010"]);
        assert_eq!(a.activity_id, 3);
        assert!(engine().evaluate(&f, 0).violated_rules.is_empty());
    }
}
