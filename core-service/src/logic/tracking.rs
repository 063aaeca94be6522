//! Centroid Tracker
//!
//! Assigns stable ids to boxes across sampled frames by nearest centroid.
//! Tracks of one class never match boxes of another class.

use std::collections::BTreeMap;

/// Max centroid jump (pixels) still considered the same object
pub const DEFAULT_MAX_DISTANCE: f64 = 50.0;

/// Frames a track survives without being seen
pub const DEFAULT_MAX_AGE: u64 = 10;

#[derive(Debug, Clone)]
struct Track {
    centroid: (f64, f64),
    class_name: String,
    last_seen: u64,
}

#[derive(Debug, Clone)]
pub struct CentroidTracker {
    next_id: u32,
    tracks: BTreeMap<u32, Track>,
    max_distance: f64,
    max_age: u64,
}

impl CentroidTracker {
    pub fn new(max_distance: f64, max_age: u64) -> Self {
        Self {
            next_id: 1,
            tracks: BTreeMap::new(),
            max_distance,
            max_age,
        }
    }

    fn centroid(bbox_xyxy: [f64; 4]) -> (f64, f64) {
        let [x1, y1, x2, y2] = bbox_xyxy;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    /// Return the track id for this box, creating a track when nothing is close enough
    pub fn track(&mut self, bbox_xyxy: [f64; 4], class_name: &str, frame_idx: u64) -> u32 {
        let centroid = Self::centroid(bbox_xyxy);

        // Expire stale tracks first
        let max_age = self.max_age;
        self.tracks
            .retain(|_, t| frame_idx.saturating_sub(t.last_seen) <= max_age);

        let mut best: Option<(u32, f64)> = None;
        for (&id, t) in &self.tracks {
            if t.class_name != class_name {
                continue;
            }
            let dist = ((centroid.0 - t.centroid.0).powi(2) + (centroid.1 - t.centroid.1).powi(2)).sqrt();
            if dist < self.max_distance && best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }

        if let Some((id, _)) = best {
            if let Some(t) = self.tracks.get_mut(&id) {
                t.centroid = centroid;
                t.last_seen = frame_idx;
            }
            return id;
        }

        let id = self.next_id;
        self.tracks.insert(
            id,
            Track {
                centroid,
                class_name: class_name.to_string(),
                last_seen: frame_idx,
            },
        );
        self.next_id += 1;
        id
    }

    /// Number of live tracks
    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE, DEFAULT_MAX_AGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let mut tracker = CentroidTracker::default();
        assert_eq!(tracker.track([0.0, 0.0, 10.0, 10.0], "person", 0), 1);
        assert_eq!(tracker.track([500.0, 500.0, 510.0, 510.0], "person", 0), 2);
    }

    #[test]
    fn test_nearby_box_keeps_id() {
        let mut tracker = CentroidTracker::default();
        let id = tracker.track([100.0, 100.0, 150.0, 200.0], "person", 0);
        let same = tracker.track([110.0, 105.0, 160.0, 205.0], "person", 5);
        assert_eq!(id, same);
        assert_eq!(tracker.active_tracks(), 1);
    }

    #[test]
    fn test_class_mismatch_creates_new_track() {
        let mut tracker = CentroidTracker::default();
        let person = tracker.track([100.0, 100.0, 150.0, 200.0], "person", 0);
        let vest = tracker.track([100.0, 100.0, 150.0, 200.0], "safety_vest", 0);
        assert_ne!(person, vest);
    }

    #[test]
    fn test_distance_is_strict() {
        let mut tracker = CentroidTracker::default();
        let a = tracker.track([0.0, 0.0, 10.0, 10.0], "person", 0);
        // centroid moves exactly 50 px
        let b = tracker.track([50.0, 0.0, 60.0, 10.0], "person", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stale_tracks_expire() {
        let mut tracker = CentroidTracker::default();
        let a = tracker.track([0.0, 0.0, 10.0, 10.0], "person", 0);
        // age 10 is still alive
        assert_eq!(tracker.track([0.0, 0.0, 10.0, 10.0], "person", 10), a);
        // age 11 expires it
        let b = tracker.track([0.0, 0.0, 10.0, 10.0], "person", 21);
        assert_ne!(a, b);
        assert_eq!(tracker.active_tracks(), 1);
    }

    #[test]
    fn test_closest_track_wins() {
        let mut tracker = CentroidTracker::default();
        let far = tracker.track([0.0, 0.0, 10.0, 10.0], "person", 0);
        let near = tracker.track([60.0, 0.0, 70.0, 10.0], "person", 0);
        // centroid (40, 5): 35 px from `far`, 25 px from `near`
        assert_eq!(tracker.track([35.0, 0.0, 45.0, 10.0], "person", 1), near);
        assert_ne!(far, near);
    }
}
