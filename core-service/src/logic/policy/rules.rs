//! Policy Rules (Extensible)
//!
//! Overrides that look at the window features, not only the risk level.
//! A rule can only raise the decision.

use super::types::*;
use crate::logic::features::FeatureLookup;
use crate::logic::risk::RiskAssessment;

/// What a rule can see
pub struct PolicyContext<'a> {
    pub assessment: &'a RiskAssessment,
    pub features: &'a dyn FeatureLookup,
}

impl PolicyContext<'_> {
    fn value(&self, name: &str) -> f64 {
        self.features.feature(name).unwrap_or(0.0)
    }
}

// ============================================================================
// POLICY RULE TRAIT
// ============================================================================

pub trait PolicyRule: Send + Sync {
    fn name(&self) -> &str;
    fn applies(&self, ctx: &PolicyContext<'_>) -> bool;
    fn override_decision(&self, current: &PolicyResult) -> Option<PolicyResult>;
}

// ============================================================================
// BUILT-IN RULES
// ============================================================================

/// EPI missing for several consecutive windows: at least notify
pub struct PersistentEpiViolationRule;

impl PolicyRule for PersistentEpiViolationRule {
    fn name(&self) -> &str {
        "PersistentEpiViolationRule"
    }

    fn applies(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.value("persistent_epi_violation") > 0.0
    }

    fn override_decision(&self, current: &PolicyResult) -> Option<PolicyResult> {
        if current.decision >= Decision::Notify {
            return None;
        }
        let mut result = current.clone();
        result.decision = Decision::Notify;
        result.severity = result.severity.max(Severity::Medium);
        result.action = ActionType::EpiReminder;
        result.reasons.push("EPI violation persists over consecutive windows".to_string());
        Some(result)
    }
}

/// Person box overlapping a machine box: escalate
pub struct MachineOverlapRule;

impl PolicyRule for MachineOverlapRule {
    fn name(&self) -> &str {
        "MachineOverlapRule"
    }

    fn applies(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.value("bbox_overlap_person_machine") > 0.0 && ctx.value("machine_presence_ratio") > 0.0
    }

    fn override_decision(&self, current: &PolicyResult) -> Option<PolicyResult> {
        if current.decision == Decision::Escalate {
            return None;
        }
        let mut result = current.clone();
        result.decision = Decision::Escalate;
        result.severity = result.severity.max(Severity::High);
        result.action = ActionType::StopWork;
        result.reasons.push("Person overlapping an active machine".to_string());
        Some(result)
    }
}

pub fn default_rules() -> Vec<Box<dyn PolicyRule>> {
    vec![Box::new(PersistentEpiViolationRule), Box::new(MachineOverlapRule)]
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Apply every matching rule in order
pub fn apply_rules(
    rules: &[Box<dyn PolicyRule>],
    ctx: &PolicyContext<'_>,
    current: &PolicyResult,
) -> PolicyResult {
    let mut result = current.clone();
    for rule in rules {
        if rule.applies(ctx) {
            if let Some(overridden) = rule.override_decision(&result) {
                log::debug!("Policy rule {} raised decision to {}", rule.name(), overridden.decision);
                result = overridden;
            }
        }
    }
    result
}
