//! Risk zone features
//!
//! Each person's ground contact point (bottom-center of the box) is
//! projected onto the site plane and tested against the zone polygons.
//! First entry / last presence per (track, zone) is remembered across windows.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::{point_in_polygon, Point};
use super::homography::{project, Homography};
use super::row::{FeatureRow, WindowExtractor};
use super::sliding_window::Window;
use super::statistics::ratio;
use crate::logic::detection::{normalize_class_name, Detection};
use crate::logic::risk::RiskLevel;

/// Risk zone in ground-plane coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub id: i64,
    /// e.g. "traffic", "height", "excavation"
    pub zone_type: String,
    pub risk_level: RiskLevel,
    pub polygon: Vec<Point>,
}

pub struct ZoneFeatures {
    zones: Vec<Zone>,
    homography: Option<Homography>,
    window_duration: f64,
    first_entry: HashMap<(u32, i64), DateTime<Utc>>,
    last_seen: HashMap<(u32, i64), DateTime<Utc>>,
}

impl ZoneFeatures {
    pub fn new(zones: Vec<Zone>, homography: Option<Homography>, window_duration: f64) -> Self {
        Self {
            zones,
            homography,
            window_duration,
            first_entry: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("num_persons_in_zone", 0.0),
            ("time_in_zone", 0.0),
            ("multiple_zone_exposure", 0.0),
            ("num_people_in_high_risk_zone", 0.0),
            ("proportion_time_in_high_risk_zone", 0.0),
            ("zone_entry_exit_events", 0.0),
        ]);
        row.first_zone_entry = None;
        row.last_zone_exit = None;
    }
}

impl WindowExtractor for ZoneFeatures {
    fn name(&self) -> &'static str {
        "zone"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        let Some(h) = self.homography else {
            Self::write_empty(row);
            return;
        };
        let persons: Vec<&Detection> = window.detections.iter().filter(|d| d.is_person()).collect();
        if self.zones.is_empty() || persons.is_empty() {
            Self::write_empty(row);
            return;
        }

        // Representative window time for entry bookkeeping
        let timestamp = persons[0].timestamp;
        let share = self.window_duration / persons.len() as f64;

        let mut persons_in_zone: BTreeMap<i64, BTreeSet<u32>> = BTreeMap::new();
        let mut person_zones: BTreeMap<u32, BTreeSet<i64>> = BTreeMap::new();
        let mut zone_time: BTreeMap<i64, f64> = BTreeMap::new();
        let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut level_counts: BTreeMap<RiskLevel, usize> = BTreeMap::new();
        let mut entries = 0usize;

        for p in &persons {
            let Some(ground) = project(p.bbox.foot_point(), &h) else {
                continue;
            };

            for zone in self.zones.iter().filter(|z| point_in_polygon(ground, &z.polygon)) {
                persons_in_zone.entry(zone.id).or_default().insert(p.track_id);
                person_zones.entry(p.track_id).or_default().insert(zone.id);
                *zone_time.entry(zone.id).or_default() += share;
                *type_counts.entry(normalize_class_name(&zone.zone_type)).or_default() += 1;
                *level_counts.entry(zone.risk_level).or_default() += 1;

                let key = (p.track_id, zone.id);
                if !self.first_entry.contains_key(&key) {
                    self.first_entry.insert(key, timestamp);
                    entries += 1;
                }
                self.last_seen.insert(key, timestamp);
            }
        }

        let high_risk: BTreeSet<i64> = self
            .zones
            .iter()
            .filter(|z| z.risk_level == RiskLevel::High)
            .map(|z| z.id)
            .collect();

        let total_time: f64 = zone_time.values().sum();
        let high_risk_time: f64 = zone_time
            .iter()
            .filter(|(id, _)| high_risk.contains(*id))
            .map(|(_, t)| t)
            .sum();
        let people_in_high_risk: usize = persons_in_zone
            .iter()
            .filter(|(id, _)| high_risk.contains(*id))
            .map(|(_, tracks)| tracks.len())
            .sum();
        let multi_zone = person_zones.values().filter(|z| z.len() > 1).count();

        row.set_all(&[
            ("num_persons_in_zone", person_zones.len() as f64),
            ("time_in_zone", total_time),
            ("multiple_zone_exposure", multi_zone as f64),
            ("num_people_in_high_risk_zone", people_in_high_risk as f64),
            ("proportion_time_in_high_risk_zone", ratio(high_risk_time, total_time)),
            ("zone_entry_exit_events", entries as f64),
        ]);
        for (zone_type, count) in type_counts {
            row.set(&format!("zone_type_{}_count", zone_type), count as f64);
        }
        for (level, count) in level_counts {
            row.set(&format!("zone_risk_{}_count", level.as_str()), count as f64);
        }

        row.first_zone_entry = self.first_entry.values().min().copied();
        row.last_zone_exit = self.last_seen.values().max().copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::detection::BBox;
    use crate::logic::features::tests::{det_box, window_over};

    const IDENTITY: Homography = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    fn square(id: i64, zone_type: &str, level: RiskLevel, x0: f64, size: f64) -> Zone {
        Zone {
            id,
            zone_type: zone_type.to_string(),
            risk_level: level,
            polygon: vec![(x0, 0.0), (x0 + size, 0.0), (x0 + size, size), (x0, size)],
        }
    }

    fn zones() -> Vec<Zone> {
        vec![
            square(1, "Excavation", RiskLevel::High, 0.0, 100.0),
            square(2, "traffic", RiskLevel::Medium, 50.0, 100.0),
        ]
    }

    #[test]
    fn test_no_homography_gives_zeros() {
        let dets = vec![det_box(0, "person", 1, BBox::new(0.0, 0.0, 20.0, 40.0))];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        ZoneFeatures::new(zones(), None, 10.0).extract(&window, &mut row);
        assert_eq!(row.value("num_persons_in_zone"), 0.0);
        assert!(row.first_zone_entry.is_none());
    }

    #[test]
    fn test_zone_membership_uses_foot_point() {
        let dets = vec![
            // foot (70, 60): inside both zones
            det_box(0, "person", 1, BBox::new(60.0, 20.0, 20.0, 40.0)),
            // foot (10, 90): only the excavation zone
            det_box(0, "person", 2, BBox::new(0.0, 50.0, 20.0, 40.0)),
            // top-left inside both zones, foot (70, 120) below them
            det_box(0, "person", 3, BBox::new(60.0, 80.0, 20.0, 40.0)),
        ];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        let mut zf = ZoneFeatures::new(zones(), Some(IDENTITY), 9.0);
        zf.extract(&window, &mut row);

        assert_eq!(row.value("num_persons_in_zone"), 2.0);
        assert_eq!(row.value("multiple_zone_exposure"), 1.0);
        assert_eq!(row.value("num_people_in_high_risk_zone"), 2.0);
        // three hits, 9 s / 3 persons each
        assert_eq!(row.value("time_in_zone"), 9.0);
        assert!((row.value("proportion_time_in_high_risk_zone") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(row.value("zone_entry_exit_events"), 3.0);
        assert_eq!(row.value("zone_type_excavation_count"), 2.0);
        assert_eq!(row.value("zone_type_traffic_count"), 1.0);
        assert_eq!(row.value("zone_risk_HIGH_count"), 2.0);
        assert_eq!(row.first_zone_entry, Some(dets[0].timestamp));

        // same people again: no new entries
        let mut row = FeatureRow::for_window(1, &window);
        zf.extract(&window, &mut row);
        assert_eq!(row.value("zone_entry_exit_events"), 0.0);
    }
}
