//! Human presence features

use std::collections::{BTreeMap, BTreeSet};

use super::row::{FeatureRow, WindowExtractor};
use super::sliding_window::{group_by_frame, Window};
use super::statistics::{maximum, mean, minimum, ratio};
use crate::logic::detection::Detection;

/// Persons per frame at which the crowding score saturates
pub const CROWDING_THRESHOLD: f64 = 5.0;

/// Displacement (px) below which a track counts as stationary
pub const STATIONARY_THRESHOLD: f64 = 2.0;

pub struct HumanPresenceFeatures {
    image_area: f64,
    stationary_threshold: f64,
}

impl HumanPresenceFeatures {
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            image_area: image_width as f64 * image_height as f64,
            stationary_threshold: STATIONARY_THRESHOLD,
        }
    }

    pub fn with_stationary_threshold(mut self, threshold: f64) -> Self {
        self.stationary_threshold = threshold;
        self
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("avg_num_persons", 0.0),
            ("max_num_persons", 0.0),
            ("unique_person_tracks", 0.0),
            ("person_density", 0.0),
            ("person_presence_ratio", 0.0),
            ("num_person_entries", 0.0),
            ("stationary_person_ratio", 0.0),
            ("crowding_score", 0.0),
            ("avg_person_height", 0.0),
        ]);
    }
}

impl WindowExtractor for HumanPresenceFeatures {
    fn name(&self) -> &'static str {
        "human"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        let persons: Vec<&Detection> = window.detections.iter().filter(|d| d.is_person()).collect();
        if persons.is_empty() {
            Self::write_empty(row);
            return;
        }

        // Distinct person tracks per frame, frames without persons excluded
        let mut per_frame: BTreeMap<i64, BTreeSet<u32>> = BTreeMap::new();
        let mut per_track: BTreeMap<u32, Vec<&Detection>> = BTreeMap::new();
        for &p in &persons {
            per_frame.entry(p.frame_key()).or_default().insert(p.track_id);
            per_track.entry(p.track_id).or_default().push(p);
        }
        let counts: Vec<f64> = per_frame.values().map(|s| s.len() as f64).collect();

        let avg_persons = mean(&counts);
        let total_frames = group_by_frame(window.detections).len() as f64;
        let total_tracks = per_track.len() as f64;

        let entries = per_track.values().filter(|obs| obs.len() == 1).count();

        let stationary = per_track
            .values()
            .filter(|obs| obs.len() >= 2)
            .filter(|obs| {
                let xs: Vec<f64> = obs.iter().map(|d| d.bbox.x).collect();
                let ys: Vec<f64> = obs.iter().map(|d| d.bbox.y).collect();
                let dx = maximum(&xs) - minimum(&xs);
                let dy = maximum(&ys) - minimum(&ys);
                dx.hypot(dy) < self.stationary_threshold
            })
            .count();

        let heights: Vec<f64> = persons.iter().map(|d| d.bbox.h).collect();

        row.set_all(&[
            ("avg_num_persons", avg_persons),
            ("max_num_persons", maximum(&counts)),
            ("unique_person_tracks", total_tracks),
            ("person_density", ratio(avg_persons, self.image_area)),
            ("person_presence_ratio", ratio(counts.len() as f64, total_frames)),
            ("num_person_entries", entries as f64),
            ("stationary_person_ratio", ratio(stationary as f64, total_tracks)),
            ("crowding_score", (avg_persons / CROWDING_THRESHOLD).min(1.0)),
            ("avg_person_height", mean(&heights)),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::tests::{det, window_over};

    #[test]
    fn test_no_person_gives_zeros() {
        let dets = vec![det(0, "vehicle", 1, 0.0, 0.0)];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        HumanPresenceFeatures::new(100, 100).extract(&window, &mut row);
        assert_eq!(row.get("avg_num_persons"), Some(0.0));
        assert_eq!(row.get("crowding_score"), Some(0.0));
    }

    #[test]
    fn test_presence_counts() {
        let dets = vec![
            // frame 0: two persons
            det(0, "person", 1, 0.0, 0.0),
            det(0, "person", 2, 300.0, 0.0),
            // frame 1: one person (track 1 stays put) + a vehicle
            det(1000, "person", 1, 1.0, 0.0),
            det(1000, "vehicle", 3, 500.0, 0.0),
            // frame 2: vehicle only
            det(2000, "vehicle", 3, 510.0, 0.0),
        ];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        HumanPresenceFeatures::new(100, 10).extract(&window, &mut row);

        assert_eq!(row.value("avg_num_persons"), 1.5);
        assert_eq!(row.value("max_num_persons"), 2.0);
        assert_eq!(row.value("unique_person_tracks"), 2.0);
        assert_eq!(row.value("person_density"), 1.5 / 1000.0);
        assert!((row.value("person_presence_ratio") - 2.0 / 3.0).abs() < 1e-9);
        // track 2 seen once
        assert_eq!(row.value("num_person_entries"), 1.0);
        // track 1 moved 1 px
        assert_eq!(row.value("stationary_person_ratio"), 0.5);
        assert_eq!(row.value("crowding_score"), 0.3);
        assert_eq!(row.value("avg_person_height"), 40.0);
    }
}
