use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logic::dataset::DatasetStats;
use crate::logic::model::EngineStatus as ModelStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub version: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,

    pub rules_loaded: usize,
    pub model_enabled: bool,
    pub dataset_enabled: bool,

    pub dataset_dir: PathBuf,
    /// None until the first record is written
    pub dataset: Option<DatasetStats>,
    pub model: ModelStatus,
}
