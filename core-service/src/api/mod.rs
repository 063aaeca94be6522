//! API Module
//!
//! Command handlers behind the CLI. Each takes the runtime config and
//! returns a serializable result; `main.rs` only parses and prints.
//!
//! Structure:
//! - commands.rs: current stable handlers
//! - engine_status.rs: `status` output

pub mod commands;
pub mod engine_status;

pub use commands::*;
