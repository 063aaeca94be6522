//! Confidence thresholds
//!
//! Per-class minimum confidence used to filter detector boxes.
//! Lookup order: camera DB config > site DB config > YAML default > 0.4

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::error::{CoreError, CoreResult};
use crate::logic::storage::DetectionRepository;

// ============================================================================
// YAML DEFAULTS
// ============================================================================

/// Thresholds from `confidence_config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub default: HashMap<String, f64>,
}

/// Load the YAML defaults.
///
/// Never fails: a missing or malformed file yields an empty config.
/// Only numeric values within `[0, 1]` are kept.
pub fn load_default_conf(path: &Path) -> ConfidenceConfig {
    if !path.exists() {
        log::debug!("No confidence file at {:?}, using built-in default", path);
        return ConfidenceConfig::default();
    }

    match try_load_conf(path) {
        Ok(conf) => conf,
        Err(e) => {
            log::warn!("Ignoring confidence file {:?}: {}", path, e);
            ConfidenceConfig::default()
        }
    }
}

fn try_load_conf(path: &Path) -> CoreResult<ConfidenceConfig> {
    let text = fs::read_to_string(path)?;
    let data: serde_yaml::Value = serde_yaml::from_str(&text)?;

    let section = data
        .as_mapping()
        .ok_or_else(|| CoreError::Config("invalid YAML structure".to_string()))?
        .get("default")
        .and_then(|v| v.as_mapping())
        .ok_or_else(|| CoreError::Config("missing 'default' section".to_string()))?;

    let mut clean = HashMap::new();
    for (key, value) in section {
        let (Some(class_name), Some(threshold)) = (key.as_str(), value.as_f64()) else {
            continue;
        };
        if (0.0..=1.0).contains(&threshold) {
            clean.insert(class_name.to_string(), threshold);
        }
    }

    Ok(ConfidenceConfig { default: clean })
}

/// Parse a `confidence_config` JSON column.
///
/// Invalid JSON counts as absent. Valid JSON that is not an object still
/// counts as present but holds no threshold.
pub fn parse_db_config(raw: &str) -> Option<HashMap<String, f64>> {
    if raw.trim().is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Invalid confidence_config JSON: {}", e);
            return None;
        }
    };

    let Some(object) = value.as_object() else {
        log::warn!("confidence_config is not a JSON object, falling back to YAML defaults");
        return Some(HashMap::new());
    };
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|t| (k.clone(), t)))
            .collect(),
    )
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Threshold lookup for one (site, camera) pair, loaded once per run.
///
/// One database config applies as a whole: the camera's when present,
/// else the site's. Classes it does not list fall back to the YAML
/// defaults, never to the other database config.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceResolver {
    db: Option<HashMap<String, f64>>,
    defaults: ConfidenceConfig,
}

impl ConfidenceResolver {
    pub fn new(
        camera: Option<HashMap<String, f64>>,
        site: Option<HashMap<String, f64>>,
        defaults: ConfidenceConfig,
    ) -> Self {
        Self {
            db: camera.or(site),
            defaults,
        }
    }

    /// Read camera and site configs from the database
    pub fn from_repository(
        repo: &DetectionRepository,
        site_id: i64,
        camera_id: i64,
        defaults: ConfidenceConfig,
    ) -> CoreResult<Self> {
        let camera = repo
            .camera_confidence_config(camera_id)?
            .as_deref()
            .and_then(parse_db_config);
        let site = repo
            .site_confidence_config(site_id)?
            .as_deref()
            .and_then(parse_db_config);

        log::debug!(
            "Confidence config loaded (camera={}, site={}, yaml classes={})",
            camera.is_some(),
            site.is_some(),
            defaults.default.len()
        );

        Ok(Self::new(camera, site, defaults))
    }

    /// Minimum confidence for a (normalized) class name
    pub fn threshold(&self, class_name: &str) -> f64 {
        self.db
            .as_ref()
            .and_then(|conf| conf.get(class_name))
            .or_else(|| self.defaults.default.get(class_name))
            .copied()
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}
