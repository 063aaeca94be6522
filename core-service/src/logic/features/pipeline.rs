//! Feature Pipeline
//!
//! Sliding windows → per-window extractors → cross-window extractors →
//! ML projection. One pipeline instance per camera: the stateful
//! extractors (EPI counter, zone memory, stability, transition) must only
//! ever see consecutive windows of a single camera.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::epi::EpiFeatures;
use super::homography::Homography;
use super::human::HumanPresenceFeatures;
use super::machine::MachineVehicleFeatures;
use super::proximity::ProximityFeatures;
use super::row::{FeatureRow, RowExtractor, WindowExtractor};
use super::sliding_window::SlidingWindow;
use super::stability::ActivityStabilityFeatures;
use super::temporal::TemporalDynamicsFeatures;
use super::transition::ActivityTransitionFeatures;
use super::vector::FeatureVector;
use super::zone::{Zone, ZoneFeatures};
use crate::error::CoreResult;
use crate::logic::config::FeatureConfig;
use crate::logic::detection::Detection;

/// All rows (audit) and their ML projection, index-aligned
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub rows: Vec<FeatureRow>,
    pub ml: Vec<FeatureVector>,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct FeaturePipeline {
    camera_id: i64,
    sliding_window: SlidingWindow,
    window_extractors: Vec<Box<dyn WindowExtractor>>,
    row_extractors: Vec<Box<dyn RowExtractor>>,
}

impl FeaturePipeline {
    /// Standard extractor chain for one camera
    pub fn new(
        camera_id: i64,
        config: &FeatureConfig,
        zones: Vec<Zone>,
        homography: Option<Homography>,
    ) -> CoreResult<Self> {
        let sliding_window = SlidingWindow::new(config.window_secs, config.step_secs)?;
        let duration = sliding_window.duration_secs();

        let window_extractors: Vec<Box<dyn WindowExtractor>> = vec![
            Box::new(
                HumanPresenceFeatures::new(config.image_width, config.image_height)
                    .with_stationary_threshold(config.stationary_threshold),
            ),
            Box::new(EpiFeatures::new(duration).with_persistent_threshold(config.persistent_epi_windows)),
            Box::new(MachineVehicleFeatures::new(duration)),
            Box::new(
                ProximityFeatures::new(duration)
                    .with_thresholds(config.danger_distance_pp, config.danger_distance_pm),
            ),
            Box::new(TemporalDynamicsFeatures::new().with_thresholds(
                config.sudden_stop_threshold,
                config.high_speed_threshold,
                config.near_machine_distance,
            )),
            Box::new(ZoneFeatures::new(zones, homography, duration)),
        ];
        let row_extractors: Vec<Box<dyn RowExtractor>> = vec![
            Box::new(ActivityStabilityFeatures::new(config.history_size)),
            Box::new(ActivityTransitionFeatures::new(config.history_size)),
        ];

        Ok(Self {
            camera_id,
            sliding_window,
            window_extractors,
            row_extractors,
        })
    }

    /// Custom extractor chain
    pub fn with_extractors(
        camera_id: i64,
        sliding_window: SlidingWindow,
        window_extractors: Vec<Box<dyn WindowExtractor>>,
        row_extractors: Vec<Box<dyn RowExtractor>>,
    ) -> Self {
        Self {
            camera_id,
            sliding_window,
            window_extractors,
            row_extractors,
        }
    }

    pub fn camera_id(&self) -> i64 {
        self.camera_id
    }

    /// Extract features for `[start, end)`.
    ///
    /// `max_windows` bounds the window index (empty windows count).
    /// Empty windows produce no row.
    pub fn run(
        &mut self,
        detections: &[Detection],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_windows: Option<usize>,
    ) -> PipelineOutput {
        let sorted: Cow<[Detection]> = if detections.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            Cow::Borrowed(detections)
        } else {
            let mut owned = detections.to_vec();
            owned.sort_by_key(|d| d.timestamp);
            Cow::Owned(owned)
        };

        let mut output = PipelineOutput::default();

        for window in self.sliding_window.windows(&sorted, start, end) {
            if max_windows.is_some_and(|max| window.index >= max) {
                break;
            }
            if window.is_empty() {
                continue;
            }

            let mut row = FeatureRow::for_window(self.camera_id, &window);
            for extractor in self.window_extractors.iter_mut() {
                extractor.extract(&window, &mut row);
            }
            for extractor in self.row_extractors.iter_mut() {
                extractor.extract(&mut row);
            }

            log::debug!(
                "Window {} (camera {}): {} detections, {} features",
                row.window_index,
                self.camera_id,
                row.num_detections,
                row.features.len()
            );

            output.ml.push(FeatureVector::from_row(&row));
            output.rows.push(row);
        }

        log::info!(
            "Feature extraction done for camera {}: {} windows with data",
            self.camera_id,
            output.len()
        );
        output
    }
}
