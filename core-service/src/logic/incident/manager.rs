use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::types::{Incident, IncidentStatus, WindowSummary};
use crate::logic::policy::PolicyResult;
use crate::logic::risk::RiskAssessment;

/// Windows closer than this to an incident's last window join it
pub const GROUPING_GAP_SECS: i64 = 60;

/// Incidents of one analysis session, grouped per camera
#[derive(Debug, Default)]
pub struct IncidentManager {
    active: HashMap<Uuid, Incident>,
}

impl IncidentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one assessed window in. Silent windows are ignored.
    ///
    /// Returns the id of the incident the window joined or opened.
    pub fn process(
        &mut self,
        camera_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        assessment: &RiskAssessment,
        policy: &PolicyResult,
    ) -> Option<Uuid> {
        if policy.decision.is_silent() {
            return None;
        }

        let summary = WindowSummary {
            window_start,
            window_end,
            activity_id: assessment.activity_id,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            decision: policy.decision,
            severity: policy.severity,
            violated_rules: assessment.rule_ids(),
        };

        // nearest open incident wins, ties go to the most recent one
        let target_id = self
            .active
            .values()
            .filter(|inc| inc.camera_id == camera_id && inc.is_open())
            .filter_map(|inc| {
                let gap = window_start.signed_duration_since(inc.last_seen).num_seconds().abs();
                (gap < GROUPING_GAP_SECS).then_some((gap, inc))
            })
            .min_by(|(gap_a, a), (gap_b, b)| {
                gap_a
                    .cmp(gap_b)
                    .then_with(|| b.last_seen.cmp(&a.last_seen))
                    .then_with(|| a.incident_id.cmp(&b.incident_id))
            })
            .map(|(_, inc)| inc.incident_id);

        match target_id.and_then(|id| self.active.get_mut(&id)) {
            Some(inc) => {
                inc.update(summary);
                Some(inc.incident_id)
            }
            None => {
                let inc = Incident::new(camera_id, summary);
                let id = inc.incident_id;
                log::info!("Incident {} opened on camera {} ({})", id, camera_id, inc.severity);
                self.active.insert(id, inc);
                Some(id)
            }
        }
    }

    /// Close open incidents whose last window is older than `timeout`
    pub fn close_stale(&mut self, now: DateTime<Utc>, timeout: Duration) -> Vec<Uuid> {
        self.close_where(now, timeout, |_| true)
    }

    /// Same as [`close_stale`](Self::close_stale), for one camera only
    pub fn close_stale_for_camera(&mut self, camera_id: i64, now: DateTime<Utc>, timeout: Duration) -> Vec<Uuid> {
        self.close_where(now, timeout, |inc| inc.camera_id == camera_id)
    }

    fn close_where(
        &mut self,
        now: DateTime<Utc>,
        timeout: Duration,
        scope: impl Fn(&Incident) -> bool,
    ) -> Vec<Uuid> {
        let mut closed = Vec::new();
        for inc in self.active.values_mut() {
            if inc.is_open() && scope(inc) && now.signed_duration_since(inc.last_seen) > timeout {
                inc.status = IncidentStatus::Closed;
                closed.push(inc.incident_id);
            }
        }
        if !closed.is_empty() {
            log::info!("Closed {} stale incident(s)", closed.len());
        }
        closed
    }

    /// All incidents, newest first
    pub fn incidents(&self) -> Vec<Incident> {
        let mut list: Vec<Incident> = self.active.values().cloned().collect();
        list.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        list
    }

    pub fn open_incidents(&self) -> Vec<Incident> {
        self.incidents().into_iter().filter(|inc| inc.is_open()).collect()
    }

    pub fn incident(&self, id: Uuid) -> Option<Incident> {
        self.active.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::{Decision, Severity};
    use crate::logic::risk::{RiskLevel, ViolatedRule};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn assessment(level: RiskLevel, score: f64) -> RiskAssessment {
        RiskAssessment {
            activity_id: 2,
            violated_rules: vec![ViolatedRule {
                rule_id: "HSE-001".to_string(),
                name: "No helmet".to_string(),
                severity: "HIGH".to_string(),
                risk_weight: score,
                description: String::new(),
                recommendation: String::new(),
                missing_epi: vec![],
            }],
            missing_epi: vec![],
            risk_score: score,
            risk_level: level,
        }
    }

    fn policy(decision: Decision, severity: Severity) -> PolicyResult {
        PolicyResult { decision, severity, ..Default::default() }
    }

    #[test]
    fn test_silent_windows_ignored() {
        let mut mgr = IncidentManager::new();
        let id = mgr.process(1, t(0), t(10), &RiskAssessment::default(), &PolicyResult::default());
        assert!(id.is_none());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_grouping_and_escalation() {
        let mut mgr = IncidentManager::new();
        let a = mgr.process(1, t(0), t(10), &assessment(RiskLevel::Medium, 40.0), &policy(Decision::Notify, Severity::Medium));
        let b = mgr.process(1, t(30), t(40), &assessment(RiskLevel::High, 95.0), &policy(Decision::Escalate, Severity::Critical));
        let c = mgr.process(1, t(60), t(70), &assessment(RiskLevel::Low, 10.0), &policy(Decision::Notify, Severity::Low));
        assert_eq!(a, b);
        assert_eq!(b, c);

        let inc = mgr.incident(a.unwrap()).unwrap();
        assert_eq!(inc.windows.len(), 3);
        // never de-escalates
        assert_eq!(inc.severity, Severity::Critical);
        assert_eq!(inc.last_seen, t(60));
        assert_eq!(inc.rule_ids(), vec!["HSE-001".to_string()]);
        assert_eq!(inc.max_risk_score(), 95.0);
    }

    #[test]
    fn test_gap_and_camera_split_incidents() {
        let mut mgr = IncidentManager::new();
        let notify = policy(Decision::Notify, Severity::Medium);
        let a = mgr.process(1, t(0), t(10), &assessment(RiskLevel::Medium, 40.0), &notify);
        // 60 s gap is not < 60
        let b = mgr.process(1, t(60), t(70), &assessment(RiskLevel::Medium, 40.0), &notify);
        let c = mgr.process(2, t(65), t(75), &assessment(RiskLevel::Medium, 40.0), &notify);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(mgr.len(), 3);
        assert_eq!(mgr.incidents()[0].started_at, t(65));
    }

    #[test]
    fn test_close_stale() {
        let mut mgr = IncidentManager::new();
        let notify = policy(Decision::Notify, Severity::Medium);
        mgr.process(1, t(0), t(10), &assessment(RiskLevel::Medium, 40.0), &notify);
        mgr.process(2, t(250), t(260), &assessment(RiskLevel::Medium, 40.0), &notify);

        let closed = mgr.close_stale(t(300), Duration::seconds(120));
        assert_eq!(closed.len(), 1);
        assert_eq!(mgr.open_incidents().len(), 1);
        assert_eq!(mgr.open_incidents()[0].camera_id, 2);

        assert!(mgr.close_stale_for_camera(1, t(1000), Duration::seconds(120)).is_empty());
        assert_eq!(mgr.close_stale_for_camera(2, t(1000), Duration::seconds(120)).len(), 1);

        // closed incidents no longer absorb windows
        let id = mgr.process(1, t(310), t(320), &assessment(RiskLevel::Medium, 40.0), &notify);
        assert!(!closed.contains(&id.unwrap()));
    }

    #[test]
    fn test_window_joins_nearest_incident() {
        let mut mgr = IncidentManager::new();
        let notify = policy(Decision::Notify, Severity::Medium);
        let a = mgr.process(1, t(100), t(110), &assessment(RiskLevel::Medium, 40.0), &notify);
        let b = mgr.process(1, t(30), t(40), &assessment(RiskLevel::Medium, 40.0), &notify);
        assert_ne!(a, b);

        // 20 s from a, 50 s from b
        let c = mgr.process(1, t(80), t(90), &assessment(RiskLevel::Medium, 40.0), &notify);
        assert_eq!(c, a);
        // 25 s from b, 55 s from a
        let d = mgr.process(1, t(55), t(65), &assessment(RiskLevel::Medium, 40.0), &notify);
        assert_eq!(d, b);
    }
}
