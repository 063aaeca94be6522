//! Policy Types
//!
//! Core types for alert decisions.
//! No logic - data structures only.

use serde::{Deserialize, Serialize};

use crate::logic::risk::{RiskAssessment, RiskLevel};

// ============================================================================
// DECISION TYPES
// ============================================================================

/// What to do with one window's assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Log only, nobody is told
    SilentLog,
    /// Notify the site supervisor
    Notify,
    /// Escalate to the HSE manager, work may have to stop
    Escalate,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::SilentLog => "silent_log",
            Decision::Notify => "notify",
            Decision::Escalate => "escalate",
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Decision::SilentLog)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SEVERITY LEVELS
// ============================================================================

/// Severity of an alert (separate from the risk level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// HIGH assessments at or above this score are Critical
pub const CRITICAL_SCORE: f64 = 90.0;

impl Severity {
    pub fn from_assessment(assessment: &RiskAssessment) -> Self {
        Self::from_level(assessment.risk_level, assessment.risk_score, CRITICAL_SCORE)
    }

    pub fn from_level(level: RiskLevel, score: f64, critical_score: f64) -> Self {
        match level {
            RiskLevel::Low => Severity::Low,
            RiskLevel::Medium => Severity::Medium,
            RiskLevel::High if score >= critical_score => Severity::Critical,
            RiskLevel::High => Severity::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "#10b981",     // Green
            Severity::Medium => "#f59e0b",  // Yellow
            Severity::High => "#f97316",    // Orange
            Severity::Critical => "#ef4444", // Red
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ACTION TYPES
// ============================================================================

/// Recommended action on site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    None,
    /// Remind workers of the EPI rules
    EpiReminder,
    /// Supervisor checks the area
    InspectArea,
    /// Stop the machine / the work in the area
    StopWork,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::None => "none",
            ActionType::EpiReminder => "epi_reminder",
            ActionType::InspectArea => "inspect_area",
            ActionType::StopWork => "stop_work",
        }
    }
}

// ============================================================================
// POLICY RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub decision: Decision,
    pub severity: Severity,
    pub action: ActionType,
    pub reasons: Vec<String>,
}

impl Default for PolicyResult {
    fn default() -> Self {
        Self {
            decision: Decision::SilentLog,
            severity: Severity::Low,
            action: ActionType::None,
            reasons: vec![],
        }
    }
}
