//! Feature Row - all values computed for one window
//!
//! Rows carry every named feature (audit / analysis). The ML subset is
//! projected from a row by [`FeatureVector::from_row`](super::FeatureVector::from_row).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sliding_window::Window;

/// Read access to named feature values
pub trait FeatureLookup {
    fn feature(&self, name: &str) -> Option<f64>;
}

impl FeatureLookup for HashMap<String, f64> {
    fn feature(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl FeatureLookup for BTreeMap<String, f64> {
    fn feature(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub window_index: usize,
    pub camera_id: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Earliest / latest detection inside the window
    pub first_detection: Option<DateTime<Utc>>,
    pub last_detection: Option<DateTime<Utc>>,
    pub num_detections: usize,
    /// Zone memory across windows (set by the zone extractor)
    pub first_zone_entry: Option<DateTime<Utc>>,
    pub last_zone_exit: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub features: BTreeMap<String, f64>,
}

impl FeatureRow {
    /// Row with window metadata filled in and no features yet
    pub fn for_window(camera_id: i64, window: &Window<'_>) -> Self {
        Self {
            window_index: window.index,
            camera_id,
            window_start: window.start,
            window_end: window.end,
            first_detection: window.detections.first().map(|d| d.timestamp),
            last_detection: window.detections.last().map(|d| d.timestamp),
            num_detections: window.detections.len(),
            first_zone_entry: None,
            last_zone_exit: None,
            features: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.features.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Value or 0 when absent
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn set_all(&mut self, values: &[(&str, f64)]) {
        for (name, value) in values {
            self.set(name, *value);
        }
    }
}

impl FeatureLookup for FeatureRow {
    fn feature(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

// ============================================================================
// EXTRACTOR TRAITS
// ============================================================================

/// Computes features from the detections of one window
pub trait WindowExtractor {
    fn name(&self) -> &'static str;

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow);
}

/// Computes features from values already present in the row
pub trait RowExtractor {
    fn name(&self) -> &'static str;

    fn extract(&mut self, row: &mut FeatureRow);
}
