//! Site Risk Core
//!
//! Construction-site risk monitoring: detector output in, per-window HSE
//! risk assessments out.

pub mod api;
pub mod constants;
pub mod error;
pub mod logic;

pub use error::{CoreError, CoreResult};
