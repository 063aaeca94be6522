//! Features Module - Spatio-temporal feature extraction
//!
//! Turns persisted detections into one feature row per sliding window.
//! Extractors are independent and write named values into the row; the
//! ML layout (`layout.rs`) selects and orders the model inputs.

pub mod geometry;
pub mod homography;
pub mod statistics;
pub mod sliding_window;
pub mod row;
pub mod layout;
pub mod vector;

pub mod human;
pub mod epi;
pub mod machine;
pub mod proximity;
pub mod temporal;
pub mod zone;
pub mod stability;
pub mod transition;

pub mod pipeline;

#[cfg(test)]
mod tests;

// Re-export common types
pub use homography::Homography;
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use pipeline::{FeaturePipeline, PipelineOutput};
pub use row::{FeatureLookup, FeatureRow, RowExtractor, WindowExtractor};
pub use sliding_window::{SlidingWindow, Window};
pub use vector::FeatureVector;
pub use zone::Zone;
