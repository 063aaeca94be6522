//! Activity types shared by every classifier

use serde::{Deserialize, Serialize};

use crate::logic::features::FeatureVector;

// ============================================================================
// ACTIVITY
// ============================================================================

/// Activity classes, ids match the rule file `activity_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Circulation,
    ManualWork,
    MachineOperation,
}

/// Number of activity classes the model is expected to output
pub const ACTIVITY_COUNT: usize = 4;

impl Activity {
    pub const ALL: [Activity; ACTIVITY_COUNT] = [
        Activity::Idle,
        Activity::Circulation,
        Activity::ManualWork,
        Activity::MachineOperation,
    ];

    pub fn id(&self) -> i64 {
        match self {
            Activity::Idle => 0,
            Activity::Circulation => 1,
            Activity::ManualWork => 2,
            Activity::MachineOperation => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Circulation => "circulation",
            Activity::ManualWork => "manual_work",
            Activity::MachineOperation => "machine_operation",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPrediction {
    pub activity_id: i64,
    pub confidence: f32,
    /// One entry per class, in id order
    pub probabilities: Vec<f32>,
    pub inference_time_us: u64,
    /// "onnx" or "heuristic"
    pub method: String,
}

impl ActivityPrediction {
    pub fn activity(&self) -> Option<Activity> {
        Activity::from_id(self.activity_id)
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub struct InferenceError(pub String);

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InferenceError: {}", self.0)
    }
}

impl std::error::Error for InferenceError {}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Maps one window's ML vector to an activity
pub trait ActivityClassifier {
    fn name(&self) -> &'static str;
    fn classify(&self, features: &FeatureVector) -> Result<ActivityPrediction, InferenceError>;
}

/// Index of the largest finite score, first one wins on ties
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Softmax unless the scores already form a distribution
pub fn to_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let is_distribution = scores.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3;
    if is_distribution {
        return scores.to_vec();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    if total > 0.0 && total.is_finite() {
        exps.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; scores.len()]
    }
}
