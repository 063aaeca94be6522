//! Risk Module
//!
//! HSE rule evaluation for one window: which rules the activity and its
//! features violate, which EPI are probably missing, and the resulting
//! score and level.
//!
//! ## Structure
//! - `types`: RiskLevel, ViolatedRule, RiskAssessment, RiskEvent
//! - `rules`: rule file schema and thresholds
//! - `engine`: evaluation logic

pub mod types;
pub mod rules;
pub mod engine;

// Re-export main types for convenience
pub use types::{RiskAssessment, RiskEvent, RiskLevel, ViolatedRule};

pub use rules::{
    Condition,
    EpiCheck,
    HseRule,
    Operator,
    RiskThresholds,
    RulesConfig,
    HIGH_RISK_THRESHOLD,
    MEDIUM_RISK_THRESHOLD,
};

pub use engine::HseRuleEngine;
