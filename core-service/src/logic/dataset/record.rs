use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::features::FeatureVector;
use crate::logic::risk::{RiskAssessment, RiskLevel};

/// One training example: a window's ML vector and what the system made of it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Window start
    pub timestamp: DateTime<Utc>,
    pub camera_id: i64,
    pub window_index: usize,

    // Feature contract
    pub feature_version: u8,
    pub layout_hash: u32,
    pub features: Vec<f32>,

    // Activity output
    pub activity_id: i64,
    pub activity_confidence: f32,
    pub activity_method: String,

    // Rule engine output
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub violated_rules: Vec<String>,

    /// Filled in later by a reviewer
    #[serde(default)]
    pub user_label: Option<i64>,
}

impl DatasetRecord {
    pub fn new(
        camera_id: i64,
        window_index: usize,
        timestamp: DateTime<Utc>,
        vector: &FeatureVector,
        activity_confidence: f32,
        activity_method: &str,
        assessment: &RiskAssessment,
    ) -> Self {
        Self {
            timestamp,
            camera_id,
            window_index,
            feature_version: vector.version,
            layout_hash: vector.layout_hash,
            features: vector.values.to_vec(),
            activity_id: assessment.activity_id,
            activity_confidence,
            activity_method: activity_method.to_string(),
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            violated_rules: assessment.rule_ids(),
            user_label: None,
        }
    }
}
