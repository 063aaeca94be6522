//! Model Module - activity classification
//!
//! One activity per window, from the ML feature vector. The ONNX model is
//! optional; the heuristic classifier always answers.

pub mod activity;
pub mod heuristic;
pub mod inference;

// Re-export common types
pub use activity::{Activity, ActivityClassifier, ActivityPrediction, InferenceError, ACTIVITY_COUNT};
pub use heuristic::HeuristicClassifier;
pub use inference::{ActivityPredictor, EngineStatus, OnnxActivityModel};
