//! Runtime configuration
//!
//! `PipelineConfig::from_env()` assembles everything from `constants.rs`
//! getters; tests build the structs directly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::features::{epi, human, proximity, stability, temporal};

// ============================================================================
// FEATURE EXTRACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub window_secs: f64,
    pub step_secs: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub stationary_threshold: f64,
    pub persistent_epi_windows: u32,
    pub danger_distance_pp: f64,
    pub danger_distance_pm: f64,
    pub sudden_stop_threshold: f64,
    pub high_speed_threshold: f64,
    pub near_machine_distance: f64,
    pub history_size: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_secs: constants::DEFAULT_WINDOW_SECS,
            step_secs: constants::DEFAULT_STEP_SECS,
            image_width: constants::DEFAULT_IMAGE_WIDTH,
            image_height: constants::DEFAULT_IMAGE_HEIGHT,
            stationary_threshold: human::STATIONARY_THRESHOLD,
            persistent_epi_windows: epi::PERSISTENT_THRESHOLD,
            danger_distance_pp: proximity::DANGER_DISTANCE_PP,
            danger_distance_pm: proximity::DANGER_DISTANCE_PM,
            sudden_stop_threshold: temporal::SUDDEN_STOP_THRESHOLD,
            high_speed_threshold: temporal::HIGH_SPEED_THRESHOLD,
            near_machine_distance: temporal::NEAR_MACHINE_DISTANCE,
            history_size: stability::DEFAULT_HISTORY_SIZE,
        }
    }
}

impl FeatureConfig {
    pub fn from_env() -> Self {
        let (image_width, image_height) = constants::get_image_size();
        Self {
            window_secs: constants::get_window_secs(),
            step_secs: constants::get_step_secs(),
            image_width,
            image_height,
            ..Self::default()
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub confidence_file: PathBuf,
    pub rules_file: PathBuf,
    pub model_path: Option<PathBuf>,
    pub model_sha256: Option<String>,
    pub dataset_dir: PathBuf,
    pub target_fps: f64,
    pub batch_size: usize,
    pub features: FeatureConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: constants::get_db_path(),
            confidence_file: constants::get_confidence_file(),
            rules_file: constants::get_rules_file(),
            model_path: constants::get_model_path(),
            model_sha256: constants::get_model_sha256(),
            dataset_dir: constants::get_dataset_dir(),
            target_fps: constants::get_target_fps(),
            batch_size: constants::get_batch_size(),
            features: FeatureConfig::from_env(),
        }
    }
}

// ============================================================================
// RUNTIME SWITCHES
// ============================================================================

// Default state: everything enabled
static MODEL_ENABLED: AtomicBool = AtomicBool::new(true);
static DATASET_ENABLED: AtomicBool = AtomicBool::new(true);

/// Process-wide switches checked by the analyzer
pub struct RuntimeSwitches;

impl RuntimeSwitches {
    /// When off, activities come from the heuristic even if a model is loaded
    pub fn is_model_enabled() -> bool {
        MODEL_ENABLED.load(Ordering::Relaxed)
    }

    /// When off, no training records are written
    pub fn is_dataset_enabled() -> bool {
        DATASET_ENABLED.load(Ordering::Relaxed)
    }

    pub fn set_model(val: bool) { MODEL_ENABLED.store(val, Ordering::Relaxed); }
    pub fn set_dataset(val: bool) { DATASET_ENABLED.store(val, Ordering::Relaxed); }
}
