//! Temporal dynamics of person tracks
//!
//! Speeds and directions come from consecutive observations of a track
//! (box centers, pixels per second).

use std::collections::BTreeMap;

use super::geometry::{direction_degrees, euclidean_distance, speed, Point};
use super::row::{FeatureRow, WindowExtractor};
use super::sliding_window::Window;
use super::statistics::{mean, std_dev, variance};
use crate::logic::detection::Detection;

/// Relative speed drop counted as a sudden stop
pub const SUDDEN_STOP_THRESHOLD: f64 = 0.5;

/// Speed (px/s) considered fast
pub const HIGH_SPEED_THRESHOLD: f64 = 50.0;

/// Machine distance (px) considered near
pub const NEAR_MACHINE_DISTANCE: f64 = 150.0;

pub struct TemporalDynamicsFeatures {
    sudden_stop_threshold: f64,
    high_speed_threshold: f64,
    near_machine_distance: f64,
}

impl TemporalDynamicsFeatures {
    pub fn new() -> Self {
        Self {
            sudden_stop_threshold: SUDDEN_STOP_THRESHOLD,
            high_speed_threshold: HIGH_SPEED_THRESHOLD,
            near_machine_distance: NEAR_MACHINE_DISTANCE,
        }
    }

    pub fn with_thresholds(mut self, sudden_stop: f64, high_speed: f64, near_machine: f64) -> Self {
        self.sudden_stop_threshold = sudden_stop;
        self.high_speed_threshold = high_speed;
        self.near_machine_distance = near_machine;
        self
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("avg_person_speed", 0.0),
            ("std_person_speed", 0.0),
            ("direction_variance", 0.0),
            ("track_lifetime_mean", 0.0),
            ("sudden_stop_events", 0.0),
            ("erratic_motion_score", 0.0),
            ("high_speed_near_machine", 0.0),
        ]);
    }
}

impl Default for TemporalDynamicsFeatures {
    fn default() -> Self {
        Self::new()
    }
}

/// One speed sample: value and where/when it ended
struct Sample {
    speed: f64,
    position: Point,
    frame: i64,
}

impl WindowExtractor for TemporalDynamicsFeatures {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        if window.is_empty() {
            Self::write_empty(row);
            return;
        }

        // Machine centers per frame
        let mut machines: BTreeMap<i64, Vec<Point>> = BTreeMap::new();
        let mut tracks: BTreeMap<u32, Vec<&Detection>> = BTreeMap::new();
        for d in window.detections {
            if d.is_machine() {
                machines.entry(d.frame_key()).or_default().push(d.bbox.center());
            } else if d.is_person() {
                tracks.entry(d.track_id).or_default().push(d);
            }
        }

        let mut speeds = Vec::new();
        let mut directions = Vec::new();
        let mut lifetimes = Vec::new();
        let mut sudden_stops = 0usize;
        let mut high_speed_near_machine = 0usize;

        for observations in tracks.values_mut() {
            observations.sort_by_key(|d| d.timestamp);

            let mut samples: Vec<Sample> = Vec::new();
            for pair in observations.windows(2) {
                let (prev, cur) = (pair[0], pair[1]);
                let dt = (cur.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
                if dt <= 0.0 {
                    continue;
                }
                let (from, to) = (prev.bbox.center(), cur.bbox.center());
                samples.push(Sample {
                    speed: speed(from, to, dt),
                    position: to,
                    frame: cur.frame_key(),
                });
                directions.push(direction_degrees(from, to));
            }

            if samples.is_empty() {
                continue;
            }
            lifetimes.push(samples.len() as f64);

            for pair in samples.windows(2) {
                if pair[1].speed < pair[0].speed * (1.0 - self.sudden_stop_threshold) {
                    sudden_stops += 1;
                }
            }

            for s in samples.iter().filter(|s| s.speed > self.high_speed_threshold) {
                let near = machines.get(&s.frame).map_or(false, |centers| {
                    centers
                        .iter()
                        .any(|c| euclidean_distance(s.position, *c) < self.near_machine_distance)
                });
                if near {
                    high_speed_near_machine += 1;
                }
            }

            speeds.extend(samples.iter().map(|s| s.speed));
        }

        let std_speed = std_dev(&speeds);
        let direction_variance = variance(&directions);

        row.set_all(&[
            ("avg_person_speed", mean(&speeds)),
            ("std_person_speed", std_speed),
            ("direction_variance", direction_variance),
            ("track_lifetime_mean", mean(&lifetimes)),
            ("sudden_stop_events", sudden_stops as f64),
            ("erratic_motion_score", std_speed * direction_variance),
            ("high_speed_near_machine", high_speed_near_machine as f64),
        ]);
    }
}
