use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::policy::{Decision, Severity};
use crate::logic::risk::RiskLevel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Closed,
}

/// One non-silent window folded into an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub activity_id: i64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    pub severity: Severity,
    pub violated_rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: Uuid,
    pub camera_id: i64,
    pub started_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    pub severity: Severity,
    pub status: IncidentStatus,

    pub windows: Vec<WindowSummary>,
}

impl Incident {
    pub fn new(camera_id: i64, first: WindowSummary) -> Self {
        Self {
            incident_id: Uuid::new_v4(),
            camera_id,
            started_at: first.window_start,
            last_seen: first.window_start,
            severity: first.severity,
            status: IncidentStatus::Open,
            windows: vec![first],
        }
    }

    pub fn update(&mut self, window: WindowSummary) {
        if window.window_start > self.last_seen {
            self.last_seen = window.window_start;
        }

        // Escalate, never de-escalate
        if window.severity > self.severity {
            self.severity = window.severity;
        }

        self.windows.push(window);
    }

    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Open
    }

    /// Distinct rule ids over all windows, first-seen order
    pub fn rule_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.windows.iter().flat_map(|w| &w.violated_rules) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn max_risk_score(&self) -> f64 {
        self.windows.iter().map(|w| w.risk_score).fold(0.0, f64::max)
    }
}
