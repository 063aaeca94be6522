//! Proximity features
//!
//! Distances are measured between box centers of the same frame only.

use super::geometry::euclidean_distance;
use super::row::{FeatureRow, WindowExtractor};
use super::sliding_window::Window;
use super::statistics::{mean, minimum, ratio, std_dev};
use crate::logic::detection::Detection;

/// Person <-> person danger distance (px)
pub const DANGER_DISTANCE_PP: f64 = 100.0;

/// Person <-> machine danger distance (px)
pub const DANGER_DISTANCE_PM: f64 = 150.0;

pub struct ProximityFeatures {
    window_duration: f64,
    danger_distance_pp: f64,
    danger_distance_pm: f64,
}

impl ProximityFeatures {
    pub fn new(window_duration: f64) -> Self {
        Self {
            window_duration,
            danger_distance_pp: DANGER_DISTANCE_PP,
            danger_distance_pm: DANGER_DISTANCE_PM,
        }
    }

    pub fn with_thresholds(mut self, person_person: f64, person_machine: f64) -> Self {
        self.danger_distance_pp = person_person;
        self.danger_distance_pm = person_machine;
        self
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("avg_person_person_distance", 0.0),
            ("std_person_person_distance", 0.0),
            ("avg_person_machine_distance", 0.0),
            ("min_person_person_distance", 0.0),
            ("min_person_machine_distance", 0.0),
            ("dangerous_proximity_frames", 0.0),
            ("bbox_overlap_person_machine", 0.0),
            ("time_near_machine", 0.0),
            ("num_machine_interactions", 0.0),
        ]);
    }
}

impl WindowExtractor for ProximityFeatures {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        let frames = window.frames();
        if frames.is_empty() {
            Self::write_empty(row);
            return;
        }

        let mut pp = Vec::new();
        let mut pm = Vec::new();
        let mut overlaps = 0usize;
        let mut interactions = 0usize;
        let mut frames_near_machine = 0usize;

        for frame in &frames {
            let persons: Vec<&Detection> = frame.iter().filter(|d| d.is_person()).collect();
            let machines: Vec<&Detection> = frame.iter().filter(|d| d.is_machine()).collect();

            for (i, a) in persons.iter().enumerate() {
                for b in &persons[i + 1..] {
                    pp.push(euclidean_distance(a.bbox.center(), b.bbox.center()));
                }
            }

            let mut near_in_frame = false;
            for p in &persons {
                for m in &machines {
                    let d = euclidean_distance(p.bbox.center(), m.bbox.center());
                    pm.push(d);
                    if d < self.danger_distance_pm {
                        interactions += 1;
                        near_in_frame = true;
                    }
                    if p.bbox.intersects(&m.bbox) {
                        overlaps += 1;
                    }
                }
            }
            if near_in_frame {
                frames_near_machine += 1;
            }
        }

        let dangerous_pp = pp.iter().filter(|d| **d < self.danger_distance_pp).count();
        let time_near_machine =
            ratio(frames_near_machine as f64, frames.len() as f64) * self.window_duration;

        row.set_all(&[
            ("avg_person_person_distance", mean(&pp)),
            ("std_person_person_distance", std_dev(&pp)),
            ("avg_person_machine_distance", mean(&pm)),
            ("min_person_person_distance", minimum(&pp)),
            ("min_person_machine_distance", minimum(&pm)),
            ("dangerous_proximity_frames", (dangerous_pp + interactions) as f64),
            ("bbox_overlap_person_machine", overlaps as f64),
            ("time_near_machine", time_near_machine),
            ("num_machine_interactions", interactions as f64),
        ]);
    }
}
