//! Logic Module - Business Logic & Engines
//!
//! - `inference/` - detector output ingestion (sampling, filtering, tracking)
//! - `storage/` - SQLite persistence
//! - `features/` - sliding-window feature extraction
//! - `model/` - activity classification (ONNX, heuristic)
//! - `risk/` - HSE rule engine
//! - `policy/`, `incident/` - alert decisions and grouping
//! - `dataset/` - training records
//! - `analysis` - everything above chained for one camera

pub mod config;
pub mod detection;
pub mod tracking;
pub mod storage;
pub mod inference;

pub mod features;
pub mod model;
pub mod risk;
pub mod policy;
pub mod incident;
pub mod dataset;

pub mod analysis;
