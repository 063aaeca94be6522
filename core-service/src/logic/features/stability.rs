//! Activity stability across consecutive windows
//!
//! Stateful: keeps the last `history_size` windows of a camera.

use std::collections::VecDeque;

use super::row::{FeatureRow, RowExtractor};
use super::statistics::{mean, std_dev};

pub const DEFAULT_HISTORY_SIZE: usize = 5;

/// Bounded FIFO of recent values
#[derive(Debug, Clone)]
pub(crate) struct History {
    values: VecDeque<f64>,
    capacity: usize,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

pub struct ActivityStabilityFeatures {
    speed: History,
    persons: History,
    erratic: History,
}

impl ActivityStabilityFeatures {
    pub fn new(history_size: usize) -> Self {
        Self {
            speed: History::new(history_size),
            persons: History::new(history_size),
            erratic: History::new(history_size),
        }
    }
}

impl Default for ActivityStabilityFeatures {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl RowExtractor for ActivityStabilityFeatures {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn extract(&mut self, row: &mut FeatureRow) {
        // History includes the current window
        self.speed.push(row.value("avg_person_speed"));
        self.persons.push(row.value("avg_num_persons"));
        self.erratic.push(row.value("erratic_motion_score"));

        if self.speed.len() < 2 {
            row.set_all(&[
                ("activity_persistence_score", 0.5),
                ("motion_consistency", 0.5),
                ("motion_stability_score", 0.5),
            ]);
            return;
        }

        let speeds = self.speed.to_vec();
        let consistency = 1.0 - std_dev(&speeds) / (mean(&speeds) + 1e-6);

        row.set_all(&[
            ("activity_persistence_score", 1.0 / (1.0 + std_dev(&self.persons.to_vec()))),
            ("motion_consistency", consistency.clamp(0.0, 1.0)),
            ("motion_stability_score", 1.0 / (1.0 + std_dev(&self.erratic.to_vec()))),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn row(speed: f64, persons: f64) -> FeatureRow {
        let now = Utc::now();
        let mut features = BTreeMap::new();
        features.insert("avg_person_speed".to_string(), speed);
        features.insert("avg_num_persons".to_string(), persons);
        FeatureRow {
            window_index: 0,
            camera_id: 1,
            window_start: now,
            window_end: now,
            first_detection: None,
            last_detection: None,
            num_detections: 1,
            first_zone_entry: None,
            last_zone_exit: None,
            features,
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut h = History::new(2);
        h.push(1.0);
        h.push(2.0);
        h.push(3.0);
        assert_eq!(h.to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_warm_up_is_neutral() {
        let mut s = ActivityStabilityFeatures::default();
        let mut r = row(10.0, 2.0);
        s.extract(&mut r);
        assert_eq!(r.value("activity_persistence_score"), 0.5);
        assert_eq!(r.value("motion_consistency"), 0.5);
    }

    #[test]
    fn test_steady_activity_scores_high() {
        let mut s = ActivityStabilityFeatures::default();
        s.extract(&mut row(10.0, 2.0));
        let mut r = row(10.0, 2.0);
        s.extract(&mut r);
        assert_eq!(r.value("activity_persistence_score"), 1.0);
        assert!(r.value("motion_consistency") > 0.99);
        assert_eq!(r.value("motion_stability_score"), 1.0);
    }

    #[test]
    fn test_changing_activity_scores_lower() {
        let mut s = ActivityStabilityFeatures::default();
        s.extract(&mut row(0.0, 0.0));
        let mut r = row(20.0, 4.0);
        s.extract(&mut r);
        // person std = 2
        assert!((r.value("activity_persistence_score") - 1.0 / 3.0).abs() < 1e-9);
        // speed std == mean
        assert!(r.value("motion_consistency") < 1e-6);
    }
}
