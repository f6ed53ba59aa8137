//! core
//!
//! Core domain types and configuration for git-octopus.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefName, BranchRef
//! - [`pattern`] - Shell-glob branch selection patterns
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing in this module touches the repository

pub mod config;
pub mod pattern;
pub mod types;
