//! Detection Module
//!
//! Detector output, persisted detections, class normalization and
//! per-class confidence thresholds.

pub mod types;
pub mod normalize;
pub mod confidence;

pub use types::{classes, BBox, Detection, RawDetection};
pub use normalize::normalize_class_name;
pub use confidence::{load_default_conf, ConfidenceConfig, ConfidenceResolver};
