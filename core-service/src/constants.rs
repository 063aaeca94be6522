//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment (or a `.env` file).

use std::path::PathBuf;

/// Default SQLite database file
pub const DEFAULT_DB_PATH: &str = "site_risk.db";

/// Default YAML file with per-class confidence thresholds
pub const DEFAULT_CONFIDENCE_FILE: &str = "config/confidence_config.yaml";

/// Default JSON file with HSE rules
pub const DEFAULT_RULES_FILE: &str = "config/hse_rules.json";

/// Threshold used when no camera, site or YAML value exists for a class
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Frames per second kept after sampling
pub const DEFAULT_TARGET_FPS: f64 = 5.0;

/// Assumed stream fps when the source does not report one
pub const FALLBACK_SOURCE_FPS: f64 = 25.0;

/// Detections buffered before a database write
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Sliding window duration (seconds)
pub const DEFAULT_WINDOW_SECS: f64 = 10.0;

/// Sliding window step (seconds)
pub const DEFAULT_STEP_SECS: f64 = 5.0;

/// Camera frame size used for density features
pub const DEFAULT_IMAGE_WIDTH: u32 = 1920;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1080;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "site-risk";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get database path from environment or use default
pub fn get_db_path() -> PathBuf {
    std::env::var("SITE_RISK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH))
}

/// Get confidence YAML path from environment or use default
pub fn get_confidence_file() -> PathBuf {
    std::env::var("SITE_RISK_CONFIDENCE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIDENCE_FILE))
}

/// Get HSE rules path from environment or use default
pub fn get_rules_file() -> PathBuf {
    std::env::var("SITE_RISK_RULES_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RULES_FILE))
}

/// Get activity model path (no default: the heuristic is used without one)
pub fn get_model_path() -> Option<PathBuf> {
    std::env::var("SITE_RISK_MODEL").ok().map(PathBuf::from)
}

/// Expected SHA-256 of the activity model, hex encoded
pub fn get_model_sha256() -> Option<String> {
    std::env::var("SITE_RISK_MODEL_SHA256").ok()
}

/// Get dataset directory from environment or use the local data dir
pub fn get_dataset_dir() -> PathBuf {
    std::env::var("SITE_RISK_DATASET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("dataset")
        })
}

pub fn get_target_fps() -> f64 {
    env_or("SITE_RISK_TARGET_FPS", DEFAULT_TARGET_FPS)
}

pub fn get_batch_size() -> usize {
    env_or("SITE_RISK_BATCH_SIZE", DEFAULT_BATCH_SIZE)
}

pub fn get_window_secs() -> f64 {
    env_or("SITE_RISK_WINDOW_SECS", DEFAULT_WINDOW_SECS)
}

pub fn get_step_secs() -> f64 {
    env_or("SITE_RISK_STEP_SECS", DEFAULT_STEP_SECS)
}

pub fn get_image_size() -> (u32, u32) {
    (
        env_or("SITE_RISK_IMAGE_WIDTH", DEFAULT_IMAGE_WIDTH),
        env_or("SITE_RISK_IMAGE_HEIGHT", DEFAULT_IMAGE_HEIGHT),
    )
}
