//! Risk Analysis - end-to-end window assessment for one camera
//!
//! detections → features → activity → HSE rules → policy → incidents,
//! with risk events and training records persisted on the way.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::logic::config::{FeatureConfig, PipelineConfig, RuntimeSwitches};
use crate::logic::dataset::{DatasetRecord, DatasetWriter};
use crate::logic::features::FeaturePipeline;
use crate::logic::incident::{Incident, IncidentManager, GROUPING_GAP_SECS};
use crate::logic::model::{ActivityPrediction, ActivityPredictor};
use crate::logic::policy::{decide_with_config, PolicyConfig, PolicyResult};
use crate::logic::risk::{HseRuleEngine, RiskAssessment, RiskEvent, RulesConfig};
use crate::logic::storage::DetectionRepository;

/// Everything decided about one window
#[derive(Debug, Clone, Serialize)]
pub struct WindowResult {
    pub window_index: usize,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub num_detections: usize,
    pub activity: ActivityPrediction,
    pub assessment: RiskAssessment,
    pub policy: PolicyResult,
    pub incident_id: Option<Uuid>,
    /// Row id of the stored risk event, for windows with violations
    pub risk_event_id: Option<i64>,
}

pub struct RiskAnalyzer {
    repo: DetectionRepository,
    features: FeatureConfig,
    engine: HseRuleEngine,
    predictor: ActivityPredictor,
    policy: PolicyConfig,
    dataset: Option<DatasetWriter>,
    incidents: IncidentManager,
}

impl RiskAnalyzer {
    pub fn new(repo: DetectionRepository, engine: HseRuleEngine, predictor: ActivityPredictor) -> Self {
        Self {
            repo,
            features: FeatureConfig::default(),
            engine,
            predictor,
            policy: PolicyConfig::default(),
            dataset: None,
            incidents: IncidentManager::new(),
        }
    }

    /// Database, rules, model and dataset directory from the runtime config
    pub fn from_config(config: &PipelineConfig) -> CoreResult<Self> {
        let repo = DetectionRepository::open(&config.db_path)?;
        let rules = RulesConfig::load(&config.rules_file)?;
        let predictor = ActivityPredictor::from_config(config.model_path.as_deref(), config.model_sha256.as_deref());

        let mut analyzer = Self::new(repo, HseRuleEngine::new(rules), predictor)
            .with_feature_config(config.features.clone());

        if RuntimeSwitches::is_dataset_enabled() {
            match DatasetWriter::from_path(config.dataset_dir.clone()) {
                Ok(writer) => analyzer = analyzer.with_dataset_writer(writer),
                Err(e) => log::warn!("Dataset logging disabled ({}): {}", config.dataset_dir.display(), e),
            }
        }
        Ok(analyzer)
    }

    pub fn with_feature_config(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dataset_writer(mut self, writer: DatasetWriter) -> Self {
        self.dataset = Some(writer);
        self
    }

    pub fn repository(&self) -> &DetectionRepository {
        &self.repo
    }

    pub fn predictor(&self) -> &ActivityPredictor {
        &self.predictor
    }

    /// Incidents accumulated over every `analyze` call, newest first
    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.incidents()
    }

    pub fn incidents_mut(&mut self) -> &mut IncidentManager {
        &mut self.incidents
    }

    /// Assess every non-empty window of `[start, end)` for one camera
    pub fn analyze(
        &mut self,
        camera_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_windows: Option<usize>,
    ) -> CoreResult<Vec<WindowResult>> {
        log::info!("Analyzing camera {} from {} to {}", camera_id, start, end);

        let detections = self.repo.try_get_detections_for_frame(camera_id, start, end)?;
        let zones = self.repo.zones_for_camera(camera_id)?;
        let homography = self.repo.camera_homography(camera_id)?;
        if !zones.is_empty() && homography.is_none() {
            log::warn!("Camera {} has zones but no homography, zone features stay at 0", camera_id);
        }

        let mut pipeline = FeaturePipeline::new(camera_id, &self.features, zones, homography)?;
        let output = pipeline.run(&detections, start, end, max_windows);
        let use_model = RuntimeSwitches::is_model_enabled();

        let mut results = Vec::with_capacity(output.len());
        for (row, vector) in output.rows.iter().zip(&output.ml) {
            let activity = self.predictor.predict(vector, use_model);
            let assessment = self.engine.evaluate(row, activity.activity_id);
            let policy = decide_with_config(&assessment, row, &self.policy);

            let incident_id = self.incidents.process(
                camera_id,
                row.window_start,
                row.window_end,
                &assessment,
                &policy,
            );

            let risk_event_id = if assessment.has_violations() {
                let event = RiskEvent::from_assessment(camera_id, row.window_start, row.window_end, &assessment);
                Some(self.repo.save_risk_event(&event)?)
            } else {
                None
            };

            if let Some(writer) = &self.dataset {
                let record = DatasetRecord::new(
                    camera_id,
                    row.window_index,
                    row.window_start,
                    vector,
                    activity.confidence,
                    &activity.method,
                    &assessment,
                );
                if let Err(e) = writer.append(&record) {
                    log::error!("Failed to append to dataset: {}", e);
                }
            }

            log::debug!(
                "Window {}: activity={} ({}) score={} level={} decision={}",
                row.window_index,
                activity.activity_id,
                activity.method,
                assessment.risk_score,
                assessment.risk_level,
                policy.decision
            );

            results.push(WindowResult {
                window_index: row.window_index,
                window_start: row.window_start,
                window_end: row.window_end,
                num_detections: row.num_detections,
                activity,
                assessment,
                policy,
                incident_id,
                risk_event_id,
            });
        }

        // no later window of this camera can join these any more
        self.incidents
            .close_stale_for_camera(camera_id, end, Duration::seconds(GROUPING_GAP_SECS));

        let violations = results.iter().filter(|r| r.assessment.has_violations()).count();
        log::info!(
            "Camera {}: {} windows assessed, {} with violations",
            camera_id,
            results.len(),
            violations
        );
        Ok(results)
    }
}
