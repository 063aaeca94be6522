//! Dataset Module - training data collection
//!
//! Records versioned feature vectors with the activity and risk decisions
//! for offline model training. JSONL files with automatic rotation.

pub mod record;
pub mod writer;
pub mod export;


pub use export::{read_records, to_jsonl};
pub use record::DatasetRecord;
pub use writer::{dataset_stats, DatasetStats, DatasetWriter, MAX_FILE_SIZE};
