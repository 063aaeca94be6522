//! Policy Engine
//!
//! Input: RiskAssessment + window features + PolicyConfig
//! Output: PolicyResult

use super::config::PolicyConfig;
use super::rules::{apply_rules, default_rules, PolicyContext};
use super::types::*;
use crate::logic::features::FeatureLookup;
use crate::logic::risk::{RiskAssessment, RiskLevel};

/// Decision from the risk level only
pub fn decide(assessment: &RiskAssessment) -> PolicyResult {
    let mut result = PolicyResult {
        severity: Severity::from_assessment(assessment),
        ..Default::default()
    };
    apply_level(assessment, &PolicyConfig::default(), &mut result);
    result
}

/// Full decision: level, then override rules
pub fn decide_with_config<L: FeatureLookup>(
    assessment: &RiskAssessment,
    features: &L,
    config: &PolicyConfig,
) -> PolicyResult {
    let mut result = PolicyResult {
        severity: Severity::from_level(assessment.risk_level, assessment.risk_score, config.critical_score),
        ..Default::default()
    };
    apply_level(assessment, config, &mut result);

    if !config.enable_rules {
        return result;
    }

    let ctx = PolicyContext { assessment, features };
    apply_rules(&default_rules(), &ctx, &result)
}

fn apply_level(assessment: &RiskAssessment, config: &PolicyConfig, result: &mut PolicyResult) {
    match assessment.risk_level {
        RiskLevel::Low if !assessment.has_violations() => {
            result.decision = if config.silent_clean { Decision::SilentLog } else { Decision::Notify };
            result.action = ActionType::None;
            result.reasons.push("No rule violated".to_string());
        }
        RiskLevel::Low | RiskLevel::Medium => {
            result.decision = Decision::Notify;
            result.action = if assessment.missing_epi.is_empty() {
                ActionType::InspectArea
            } else {
                ActionType::EpiReminder
            };
            result.reasons.push(format!(
                "{} risk: {} rule(s) violated",
                assessment.risk_level,
                assessment.violated_rules.len()
            ));
        }
        RiskLevel::High => {
            result.decision = Decision::Escalate;
            result.action = ActionType::StopWork;
            result.reasons.push(format!("HIGH risk (score {:.0})", assessment.risk_score));
        }
    }
}

/// Quick decision from the level alone
pub fn decide_simple(level: RiskLevel, has_violations: bool) -> Decision {
    match level {
        RiskLevel::Low if !has_violations => Decision::SilentLog,
        RiskLevel::Low | RiskLevel::Medium => Decision::Notify,
        RiskLevel::High => Decision::Escalate,
    }
}

// ============================================================================
// TESTS
// ============================================================================
