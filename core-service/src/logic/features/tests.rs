//! Shared fixtures and integration tests for the feature extractors

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::sliding_window::Window;
use crate::logic::detection::{BBox, Detection};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

/// Detection `offset_ms` after [`base_time`] with a 20x40 box at (x, y)
pub fn det(offset_ms: i64, class: &str, track_id: u32, x: f64, y: f64) -> Detection {
    det_box(offset_ms, class, track_id, BBox::new(x, y, 20.0, 40.0))
}

pub fn det_box(offset_ms: i64, class: &str, track_id: u32, bbox: BBox) -> Detection {
    Detection {
        camera_id: 1,
        timestamp: base_time() + Duration::milliseconds(offset_ms),
        object_class: class.to_string(),
        confidence: 0.9,
        bbox,
        track_id,
    }
}

/// 10 s window starting at [`base_time`] over sorted detections
pub fn window_over(detections: &[Detection]) -> Window<'_> {
    Window {
        index: 0,
        start: base_time(),
        end: base_time() + Duration::seconds(10),
        detections,
    }
}

mod integration_tests {
    use super::*;
    use crate::logic::config::FeatureConfig;
    use crate::logic::features::{FeaturePipeline, Zone, FEATURE_COUNT};
    use crate::logic::risk::RiskLevel;

    /// Worker without helmet walking next to an excavator, 2 fps for 30 s
    fn site_scene() -> Vec<Detection> {
        let mut dets = Vec::new();
        for i in 0..60i64 {
            let t = i * 500;
            let x = 100.0 + i as f64 * 2.0;
            dets.push(det_box(t, "person", 1, BBox::new(x, 200.0, 40.0, 100.0)));
            dets.push(det_box(t, "no_hardhat", 2, BBox::new(x + 10.0, 200.0, 20.0, 20.0)));
            dets.push(det_box(t, "machinery", 3, BBox::new(x + 60.0, 180.0, 150.0, 120.0)));
        }
        dets
    }

    fn config() -> FeatureConfig {
        FeatureConfig {
            window_secs: 10.0,
            step_secs: 5.0,
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn test_pipeline_rows_and_vectors_align() {
        let dets = site_scene();
        let mut pipeline = FeaturePipeline::new(1, &config(), vec![], None).unwrap();
        let out = pipeline.run(&dets, base_time(), base_time() + Duration::seconds(30), None);

        // starts 0, 5, 10, 15, 20
        assert_eq!(out.len(), 5);
        assert_eq!(out.ml.len(), out.rows.len());
        for (row, vector) in out.rows.iter().zip(&out.ml) {
            assert_eq!(vector.values.len(), FEATURE_COUNT);
            assert_eq!(vector.get_by_name("avg_num_persons"), Some(row.value("avg_num_persons") as f32));
        }

        let first = &out.rows[0];
        assert_eq!(first.window_index, 0);
        assert_eq!(first.num_detections, 60);
        assert_eq!(first.value("avg_num_persons"), 1.0);
        assert_eq!(first.value("helmet_compliance_ratio"), 0.0);
        assert_eq!(first.value("num_no_helmet_events"), 1.0);
        assert_eq!(first.value("co_presence_person_machine"), 1.0);
        assert!(first.value("num_machine_interactions") > 0.0);
        assert!(first.value("avg_person_speed") > 0.0);
        // neutral stability on the first window
        assert_eq!(first.value("motion_consistency"), 0.5);
        // EPI violation persists from the third window on
        assert_eq!(out.rows[1].value("persistent_epi_violation"), 0.0);
        assert_eq!(out.rows[2].value("persistent_epi_violation"), 1.0);
    }

    #[test]
    fn test_empty_windows_skipped_but_counted() {
        // detections only in [20 s, 30 s)
        let dets: Vec<Detection> = site_scene()
            .into_iter()
            .map(|mut d| {
                d.timestamp = d.timestamp + Duration::seconds(20);
                d
            })
            .filter(|d| d.timestamp < base_time() + Duration::seconds(30))
            .collect();

        let mut pipeline = FeaturePipeline::new(1, &config(), vec![], None).unwrap();
        let out = pipeline.run(&dets, base_time(), base_time() + Duration::seconds(30), None);
        let indices: Vec<usize> = out.rows.iter().map(|r| r.window_index).collect();
        assert_eq!(indices, vec![3, 4]);

        let mut pipeline = FeaturePipeline::new(1, &config(), vec![], None).unwrap();
        let limited = pipeline.run(&dets, base_time(), base_time() + Duration::seconds(30), Some(4));
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let mut dets = site_scene();
        dets.reverse();
        let mut pipeline = FeaturePipeline::new(1, &config(), vec![], None).unwrap();
        let out = pipeline.run(&dets, base_time(), base_time() + Duration::seconds(10), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0].num_detections, 60);
    }

    #[test]
    fn test_zone_features_with_homography() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let zone = Zone {
            id: 1,
            zone_type: "excavation".to_string(),
            risk_level: RiskLevel::High,
            polygon: vec![(0.0, 250.0), (1000.0, 250.0), (1000.0, 400.0), (0.0, 400.0)],
        };
        let dets = site_scene();
        let mut pipeline = FeaturePipeline::new(1, &config(), vec![zone], Some(identity)).unwrap();
        let out = pipeline.run(&dets, base_time(), base_time() + Duration::seconds(10), None);

        let row = &out.rows[0];
        assert_eq!(row.value("num_persons_in_zone"), 1.0);
        assert_eq!(row.value("num_people_in_high_risk_zone"), 1.0);
        assert_eq!(row.value("proportion_time_in_high_risk_zone"), 1.0);
        assert_eq!(row.first_zone_entry, Some(base_time()));
    }
}
