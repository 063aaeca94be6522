//! Policy Module
//!
//! Decides what happens with a window assessment: log it, notify the site
//! supervisor, or escalate.
//!
//! ## Structure
//! - `types`: Decision, Severity, ActionType, PolicyResult
//! - `config`: Policy configuration
//! - `engine`: Decision logic
//! - `rules`: Feature-based overrides
//!
//! ## Usage
//! ```ignore
//! use crate::logic::policy::{decide_with_config, Decision, PolicyConfig};
//!
//! let result = decide_with_config(&assessment, &row, &PolicyConfig::default());
//! match result.decision {
//!     Decision::SilentLog => log_only(),
//!     Decision::Notify => notify_supervisor(),
//!     Decision::Escalate => escalate(),
//! }
//! ```

pub mod types;
pub mod config;
pub mod engine;
pub mod rules;

// Re-export main types for convenience
pub use types::{ActionType, Decision, PolicyResult, Severity, CRITICAL_SCORE};

pub use config::PolicyConfig;

pub use engine::{decide, decide_simple, decide_with_config};

pub use rules::{apply_rules, default_rules, MachineOverlapRule, PersistentEpiViolationRule, PolicyContext, PolicyRule};
