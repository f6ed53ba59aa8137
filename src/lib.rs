//! git-octopus - merge every branch matching a pattern into one octopus commit
//!
//! git-octopus selects branches by shell-glob patterns, folds them one by one
//! into the checked-out branch, leaves out branches that conflict, and records
//! the result as a single merge commit with one parent per merged branch.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resolve -> Merge -> Commit -> Publish
//! - [`core`] - Domain types, patterns and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//! - [`telemetry`] - `tracing` diagnostics setup
//!
//! # Correctness Invariants
//!
//! 1. Tree merges happen in the object database, never in the working tree
//! 2. The checked-out branch moves at most once per run, by compare-and-swap
//! 3. A failed run leaves the branch where it was

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod telemetry;
pub mod ui;
