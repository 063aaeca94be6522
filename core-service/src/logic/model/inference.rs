//! Inference Engine - ONNX Runtime Integration
//!
//! `OnnxActivityModel` wraps one ONNX session. `ActivityPredictor` is what
//! the analyzer calls: model when available and enabled, heuristic
//! otherwise, plus latency counters.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::activity::{argmax, to_probabilities, ActivityClassifier, ActivityPrediction, InferenceError, ACTIVITY_COUNT};
use super::heuristic::HeuristicClassifier;
use crate::logic::features::{FeatureVector, FEATURE_COUNT};

// ============================================================================
// CHECKSUM
// ============================================================================

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compare against an expected hex digest (case-insensitive)
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), InferenceError> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(InferenceError(format!(
            "Model checksum mismatch: expected {}, got {}",
            expected.trim(),
            actual
        )))
    }
}

// ============================================================================
// ONNX MODEL
// ============================================================================

pub struct OnnxActivityModel {
    session: Mutex<Session>,
    output_name: String,
    model_path: PathBuf,
    loaded_at: chrono::DateTime<chrono::Utc>,
}

impl std::fmt::Debug for OnnxActivityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxActivityModel")
            .field("model_path", &self.model_path)
            .field("output_name", &self.output_name)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl OnnxActivityModel {
    /// Load a model file, verifying its SHA-256 first when given
    pub fn load(model_path: &Path, expected_sha256: Option<&str>) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(InferenceError(format!("Model not found: {}", model_path.display())));
        }

        let bytes = std::fs::read(model_path)
            .map_err(|e| InferenceError(format!("Failed to read model: {}", e)))?;

        if let Some(expected) = expected_sha256 {
            verify_checksum(&bytes, expected)?;
            log::info!("Model checksum verified");
        }

        let session = Session::builder()
            .map_err(|e| InferenceError(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError(format!("Failed to set optimization: {}", e)))?
            .commit_from_memory(&bytes)
            .map_err(|e| InferenceError(format!("Failed to load model: {}", e)))?;

        // sklearn-style exports put the label first and probabilities second
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.to_lowercase().contains("prob"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully (output: {})", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            model_path: model_path.to_path_buf(),
            loaded_at: chrono::Utc::now(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Raw scores for one `1 x FEATURE_COUNT` input
    fn run(&self, features: &FeatureVector) -> Result<Vec<f32>, InferenceError> {
        features
            .validate()
            .map_err(|e| InferenceError(format!("Incompatible feature vector: {}", e)))?;

        let input_array = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), features.values.to_vec())
            .map_err(|e| InferenceError(format!("Array error: {}", e)))?;
        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        Ok(data.to_vec())
    }
}

impl ActivityClassifier for OnnxActivityModel {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn classify(&self, features: &FeatureVector) -> Result<ActivityPrediction, InferenceError> {
        let start_time = std::time::Instant::now();
        let scores = self.run(features)?;
        prediction_from_scores(&scores, start_time.elapsed().as_micros() as u64)
    }
}

/// Turn model output into a prediction.
///
/// A single value is read as the label; otherwise the output must carry
/// one score per activity class.
pub fn prediction_from_scores(scores: &[f32], inference_time_us: u64) -> Result<ActivityPrediction, InferenceError> {
    match scores.len() {
        1 => {
            let label = scores[0];
            if !label.is_finite() || label < 0.0 || label.round() as usize >= ACTIVITY_COUNT {
                return Err(InferenceError(format!("Label out of range: {}", label)));
            }
            let activity_id = label.round() as usize;
            let mut probabilities = vec![0.0; ACTIVITY_COUNT];
            probabilities[activity_id] = 1.0;
            Ok(ActivityPrediction {
                activity_id: activity_id as i64,
                confidence: 1.0,
                probabilities,
                inference_time_us,
                method: "onnx".to_string(),
            })
        }
        ACTIVITY_COUNT => {
            let probabilities = to_probabilities(scores);
            let best = argmax(&probabilities)
                .ok_or_else(|| InferenceError("No finite score in output".to_string()))?;
            Ok(ActivityPrediction {
                activity_id: best as i64,
                confidence: probabilities[best],
                probabilities,
                inference_time_us,
                method: "onnx".to_string(),
            })
        }
        n => Err(InferenceError(format!(
            "Unexpected output size {} (expected {} classes)",
            n, ACTIVITY_COUNT
        ))),
    }
}

// ============================================================================
// PREDICTOR (model + fallback)
// ============================================================================

/// Engine status for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
    pub fallback_count: u64,
}

#[derive(Debug, Default)]
pub struct ActivityPredictor {
    model: Option<OnnxActivityModel>,
    fallback: HeuristicClassifier,
    latency_sum: AtomicU64,
    inference_count: AtomicU64,
    fallback_count: AtomicU64,
}

impl ActivityPredictor {
    pub fn new(model: Option<OnnxActivityModel>) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Heuristic only
    pub fn heuristic() -> Self {
        Self::default()
    }

    /// Load the configured model; a load failure leaves the heuristic in charge
    pub fn from_config(model_path: Option<&Path>, expected_sha256: Option<&str>) -> Self {
        let model = model_path.and_then(|path| match OnnxActivityModel::load(path, expected_sha256) {
            Ok(model) => Some(model),
            Err(e) => {
                log::warn!("Activity model unavailable ({}), using heuristic classifier", e);
                None
            }
        });
        Self::new(model)
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// ONNX if loaded and `use_model`, heuristic otherwise
    pub fn predict(&self, features: &FeatureVector, use_model: bool) -> ActivityPrediction {
        let result = match self.model.as_ref().filter(|_| use_model) {
            Some(model) => match model.classify(features) {
                Ok(prediction) => prediction,
                Err(e) => {
                    log::warn!("ONNX failed ({}), using fallback", e);
                    self.fallback_count.fetch_add(1, Ordering::Relaxed);
                    self.fallback.predict(features)
                }
            },
            None => self.fallback.predict(features),
        };

        self.latency_sum.fetch_add(result.inference_time_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: self.model.is_some(),
            model_name: self
                .model
                .as_ref()
                .map(|m| m.model_path().display().to_string())
                .unwrap_or_else(|| "None".to_string()),
            avg_latency_ms: avg,
            inference_count: count,
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
        }
    }
}
