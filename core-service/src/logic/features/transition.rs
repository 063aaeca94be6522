//! Activity transitions across consecutive windows
//!
//! Compares the current window with the previous ones; the current
//! window joins the history only after the comparison.

use super::row::{FeatureRow, RowExtractor};
use super::stability::{History, DEFAULT_HISTORY_SIZE};
use super::statistics::{mean, std_dev};

pub struct ActivityTransitionFeatures {
    persons: History,
    zones: History,
    high_risk: History,
}

impl ActivityTransitionFeatures {
    pub fn new(history_size: usize) -> Self {
        Self {
            persons: History::new(history_size),
            zones: History::new(history_size),
            high_risk: History::new(history_size),
        }
    }

    fn push(&mut self, persons: f64, zones: f64, high_risk: f64) {
        self.persons.push(persons);
        self.zones.push(zones);
        self.high_risk.push(high_risk);
    }
}

impl Default for ActivityTransitionFeatures {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl RowExtractor for ActivityTransitionFeatures {
    fn name(&self) -> &'static str {
        "transition"
    }

    fn extract(&mut self, row: &mut FeatureRow) {
        let persons = row.value("avg_num_persons");
        let zones = row.value("num_persons_in_zone");
        let high_risk = row.value("num_people_in_high_risk_zone");

        if self.persons.len() < 2 {
            self.push(persons, zones, high_risk);
            row.set_all(&[
                ("activity_change_rate", 0.0),
                ("zone_transition_count", 0.0),
                ("risk_transition_score", 0.0),
            ]);
            return;
        }

        let prev_persons = mean(&self.persons.to_vec());
        let change_rate = if prev_persons > 0.0 {
            (persons - prev_persons).abs() / (prev_persons + 1e-6)
        } else {
            0.0
        };

        let zone_transitions = std_dev(&self.zones.to_vec()).round();

        let risk_history = self.high_risk.to_vec();
        let risk_transition = std_dev(&risk_history) / (mean(&risk_history) + 1e-6);

        self.push(persons, zones, high_risk);

        row.set_all(&[
            ("activity_change_rate", change_rate.clamp(0.0, 1.0)),
            ("zone_transition_count", zone_transitions),
            ("risk_transition_score", risk_transition.clamp(0.0, 1.0)),
        ]);
    }
}
