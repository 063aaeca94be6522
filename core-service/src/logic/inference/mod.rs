//! Inference Module
//!
//! Detector output ingestion: sampling, confidence filtering, tracking
//! and batched persistence.

pub mod source;
pub mod runner;

pub use source::{DetectionSink, FrameDetections, FrameSource, JsonlFrameSource, MemoryFrameSource};
pub use runner::{frame_step, InferenceRunner, RunStats};
