//! Feature Vector - model input
//!
//! Versioned projection of a [`FeatureRow`] onto the ML layout.

use serde::{Deserialize, Serialize};

use super::layout::{feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
use super::row::{FeatureLookup, FeatureRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Values in `FEATURE_LAYOUT` order
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Zeroed vector with the current layout
    pub fn new() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// ML columns of a row; names the row lacks are 0
    pub fn from_row(row: &FeatureRow) -> Self {
        Self::from_lookup(row)
    }

    pub fn from_lookup<L: FeatureLookup + ?Sized>(features: &L) -> Self {
        let mut values = [0.0f32; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_LAYOUT) {
            let v = features.feature(name).unwrap_or(0.0);
            *slot = if v.is_finite() { v as f32 } else { 0.0 };
        }
        Self::from_values(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        feature_index(name).and_then(|i| self.get(i))
    }

    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        match feature_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    /// JSON form for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values.to_vec(),
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureLookup for FeatureVector {
    fn feature(&self, name: &str) -> Option<f64> {
        self.get_by_name(name).map(f64::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_new_vector_is_current_layout() {
        let vector = FeatureVector::new();
        assert_eq!(vector.version, FEATURE_VERSION);
        assert!(vector.is_compatible());
        assert!(vector.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_from_lookup_fills_missing_with_zero() {
        let features = HashMap::from([
            ("avg_num_persons".to_string(), 2.5),
            ("not_a_model_column".to_string(), 9.0),
            ("erratic_motion_score".to_string(), f64::NAN),
        ]);
        let vector = FeatureVector::from_lookup(&features);
        assert_eq!(vector.get_by_name("avg_num_persons"), Some(2.5));
        assert_eq!(vector.get_by_name("time_near_machine"), Some(0.0));
        assert_eq!(vector.get_by_name("erratic_motion_score"), Some(0.0));
        assert_eq!(vector.get_by_name("not_a_model_column"), None);
    }

    #[test]
    fn test_set_by_name() {
        let mut vector = FeatureVector::new();
        assert!(vector.set_by_name("num_no_helmet_events", 3.0));
        assert_eq!(vector.feature("num_no_helmet_events"), Some(3.0));
        assert!(!vector.set_by_name("nonexistent", 1.0));
    }

    #[test]
    fn test_to_log_entry() {
        let log = FeatureVector::new().to_log_entry();
        assert_eq!(log["feature_version"], FEATURE_VERSION);
        assert!(log["layout_hash"].as_u64().is_some());
        assert_eq!(log["values"].as_array().map(|v| v.len()), Some(FEATURE_COUNT));
    }
}
