//! Incident Module
//!
//! Groups non-silent window assessments of one camera into incidents.

pub mod types;
pub mod manager;

pub use manager::{IncidentManager, GROUPING_GAP_SECS};
pub use types::{Incident, IncidentStatus, WindowSummary};
