//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and run reports
//!
//! # Design
//!
//! All text meant for the user goes through this module so quiet, debug and
//! JSON modes behave the same everywhere. Diagnostics for developers go
//! through `tracing` instead (see [`crate::telemetry`]).

pub mod output;
