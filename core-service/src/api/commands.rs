//! Command handlers
//!
//! anyhow at this edge only; everything below returns `CoreResult`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::engine_status::EngineStatus;
use crate::constants::APP_VERSION;
use crate::logic::analysis::{RiskAnalyzer, WindowResult};
use crate::logic::config::{PipelineConfig, RuntimeSwitches};
use crate::logic::dataset;
use crate::logic::detection::{load_default_conf, ConfidenceResolver};
use crate::logic::features::{layout, FeaturePipeline, FeatureRow, Homography, Zone, FEATURE_COUNT, FEATURE_VERSION};
use crate::logic::incident::Incident;
use crate::logic::inference::{InferenceRunner, JsonlFrameSource, RunStats};
use crate::logic::model::ActivityPredictor;
use crate::logic::risk::RulesConfig;
use crate::logic::storage::{CameraRecord, DetectionRepository};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRegistration {
    pub site_id: i64,
    pub site_name: String,
    pub camera_id: i64,
    pub camera_name: String,
    /// JSON object of class -> threshold
    pub confidence_config: Option<String>,
}

/// `assess` output
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub camera_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub windows: Vec<WindowResult>,
    pub incidents: Vec<Incident>,
}

// ============================================================================
// HELPERS
// ============================================================================

fn open_repo(config: &PipelineConfig) -> Result<DetectionRepository> {
    DetectionRepository::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Explicit range, or the camera's whole detection span
fn resolve_range(
    repo: &DetectionRepository,
    camera_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let span = repo.detection_time_range(camera_id)?;
    let start = match start.or(span.map(|(s, _)| s)) {
        Some(s) => s,
        None => bail!("No detections for camera {} and no --start given", camera_id),
    };
    // the last detection must fall inside [start, end)
    let end = end
        .or(span.map(|(_, e)| e + Duration::milliseconds(1)))
        .unwrap_or(start);
    if end <= start {
        bail!("Empty time range: {} .. {}", start, end);
    }
    Ok((start, end))
}

// ============================================================================
// COMMANDS
// ============================================================================

pub fn init_db(config: &PipelineConfig) -> Result<()> {
    open_repo(config)?;
    Ok(())
}

pub fn register_camera(
    config: &PipelineConfig,
    registration: &CameraRegistration,
    homography_file: Option<&Path>,
) -> Result<()> {
    if let Some(raw) = registration.confidence_config.as_deref() {
        serde_json::from_str::<std::collections::HashMap<String, f64>>(raw)
            .context("Confidence config must be a JSON object of class -> threshold")?;
    }
    let homography = homography_file.map(read_json::<Homography>).transpose()?;

    let repo = open_repo(config)?;
    repo.upsert_site(registration.site_id, &registration.site_name, None)?;
    repo.upsert_camera(&CameraRecord {
        id: registration.camera_id,
        site_id: registration.site_id,
        name: registration.camera_name.clone(),
        confidence_config: registration.confidence_config.clone(),
        homography,
    })?;
    log::info!(
        "Camera {} registered on site {}",
        registration.camera_id,
        registration.site_id
    );
    Ok(())
}

/// Zones file: JSON array of `{zone_type, risk_level, polygon}`
pub fn import_zones(config: &PipelineConfig, camera_id: i64, zones_file: &Path) -> Result<usize> {
    let zones: Vec<Zone> = read_json(zones_file)?;
    let repo = open_repo(config)?;
    for zone in &zones {
        repo.insert_zone(camera_id, zone)
            .with_context(|| format!("Failed to import zone '{}'", zone.zone_type))?;
    }
    log::info!("Imported {} zones for camera {}", zones.len(), camera_id);
    Ok(zones.len())
}

/// Replay a JSONL detector dump into the database
pub fn ingest(
    config: &PipelineConfig,
    camera_id: i64,
    input: &Path,
    source_fps: Option<f64>,
    start: DateTime<Utc>,
) -> Result<RunStats> {
    let mut repo = open_repo(config)?;
    let site_id = repo
        .camera_site_id(camera_id)?
        .with_context(|| format!("Camera {} is not registered", camera_id))?;

    let defaults = load_default_conf(&config.confidence_file);
    let resolver = ConfidenceResolver::from_repository(&repo, site_id, camera_id, defaults)?;

    let mut source = JsonlFrameSource::open(input, source_fps, start)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut runner = InferenceRunner::new(camera_id, resolver)
        .with_target_fps(config.target_fps)
        .with_batch_size(config.batch_size);

    Ok(runner.run(&mut source, &mut repo)?)
}

pub fn extract_features(
    config: &PipelineConfig,
    camera_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    max_windows: Option<usize>,
) -> Result<Vec<FeatureRow>> {
    let repo = open_repo(config)?;
    let (start, end) = resolve_range(&repo, camera_id, start, end)?;

    let detections = repo.try_get_detections_for_frame(camera_id, start, end)?;
    let zones = repo.zones_for_camera(camera_id)?;
    let homography = repo.camera_homography(camera_id)?;

    let mut pipeline = FeaturePipeline::new(camera_id, &config.features, zones, homography)?;
    Ok(pipeline.run(&detections, start, end, max_windows).rows)
}

pub fn assess(
    config: &PipelineConfig,
    camera_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    max_windows: Option<usize>,
) -> Result<AssessmentReport> {
    let mut analyzer = RiskAnalyzer::from_config(config).context("Failed to set up the analyzer")?;
    let (start, end) = resolve_range(analyzer.repository(), camera_id, start, end)?;

    let windows = analyzer.analyze(camera_id, start, end, max_windows)?;
    Ok(AssessmentReport {
        camera_id,
        start,
        end,
        windows,
        incidents: analyzer.incidents(),
    })
}

pub fn export_dataset(config: &PipelineConfig, target: &Path) -> Result<usize> {
    dataset::to_jsonl(&config.dataset_dir, target)
        .with_context(|| format!("Failed to export dataset from {}", config.dataset_dir.display()))
}

pub fn get_engine_status(config: &PipelineConfig) -> Result<EngineStatus> {
    let rules_loaded = RulesConfig::load(&config.rules_file)
        .map(|r| r.rules.len())
        .unwrap_or_else(|e| {
            log::warn!("Rules not loaded: {}", e);
            0
        });
    let predictor = ActivityPredictor::from_config(config.model_path.as_deref(), config.model_sha256.as_deref());
    let dataset = if config.dataset_dir.is_dir() {
        dataset::dataset_stats(&config.dataset_dir)
            .map_err(|e| log::warn!("Dataset stats unavailable: {}", e))
            .ok()
    } else {
        None
    };

    Ok(EngineStatus {
        version: APP_VERSION.to_string(),
        feature_version: FEATURE_VERSION,
        layout_hash: layout::layout_hash(),
        feature_count: FEATURE_COUNT,
        rules_loaded,
        model_enabled: RuntimeSwitches::is_model_enabled(),
        dataset_enabled: RuntimeSwitches::is_dataset_enabled(),
        dataset_dir: config.dataset_dir.clone(),
        dataset,
        model: predictor.status(),
    })
}
