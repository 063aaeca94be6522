//! Storage Module
//!
//! SQLite persistence layer.

pub mod schema;
pub mod retry;
pub mod repository;

pub use repository::{CameraRecord, DetectionRepository};
pub use retry::RetryPolicy;
