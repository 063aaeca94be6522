//! Risk Types
//!
//! Core types for HSE risk assessment.
//! No logic - data structures only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RISK LEVEL
// ============================================================================

/// Risk level of one analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Case-insensitive parse of `LOW` / `MEDIUM` / `HIGH`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(RiskLevel::Low),
            "MEDIUM" => Some(RiskLevel::Medium),
            "HIGH" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// A rule whose conditions all held for the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolatedRule {
    pub rule_id: String,
    pub name: String,
    pub severity: String,
    pub risk_weight: f64,
    pub description: String,
    pub recommendation: String,
    /// EPI items judged probably missing for this rule
    pub missing_epi: Vec<String>,
}

/// Rule engine output for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub activity_id: i64,
    pub violated_rules: Vec<ViolatedRule>,
    /// Deduplicated across all violated rules
    pub missing_epi: Vec<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

impl RiskAssessment {
    pub fn has_violations(&self) -> bool {
        !self.violated_rules.is_empty()
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.violated_rules.iter().map(|r| r.rule_id.clone()).collect()
    }
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            activity_id: 0,
            violated_rules: vec![],
            missing_epi: vec![],
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
        }
    }
}

// ============================================================================
// RISK EVENT
// ============================================================================

/// Persisted record of a window with at least one violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub camera_id: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub activity_id: i64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub violated_rules: Vec<String>,
    pub missing_epi: Vec<String>,
}

impl RiskEvent {
    pub fn from_assessment(
        camera_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        assessment: &RiskAssessment,
    ) -> Self {
        Self {
            camera_id,
            window_start,
            window_end,
            activity_id: assessment.activity_id,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            violated_rules: assessment.rule_ids(),
            missing_epi: assessment.missing_epi.clone(),
        }
    }
}
