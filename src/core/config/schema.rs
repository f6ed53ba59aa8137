//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GIT_OCTOPUS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-octopus/config.toml`
//! 3. `~/.git-octopus/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/octopus/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad pattern or a zero
//! chunk size is reported when the file is loaded, not halfway through a merge.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::pattern::RefPattern;

/// Merge behavior shared by both scopes.
///
/// # Example
///
/// ```toml
/// strict = false
/// chunk_size = 10
/// allow_empty = true
/// fast_forward = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Abort on the first conflicting branch instead of excluding it
    pub strict: Option<bool>,

    /// Merge in chunks of this many branches
    pub chunk_size: Option<usize>,

    /// Commit even when the merged tree equals HEAD's tree
    pub allow_empty: Option<bool>,

    /// Fast-forward when a single head is ahead of HEAD
    pub fast_forward: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chunk_size(self.chunk_size)
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// patterns = ["feature/*", "fix/*"]
/// exclude_patterns = ["feature/wip-*"]
/// strict = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Patterns used when none are given on the command line
    pub patterns: Vec<String>,

    /// Branches matching these are never merged
    pub exclude_patterns: Vec<String>,

    /// Overrides the global `strict`
    pub strict: Option<bool>,

    /// Overrides the global `chunk_size`
    pub chunk_size: Option<usize>,

    /// Overrides the global `allow_empty`
    pub allow_empty: Option<bool>,

    /// Overrides the global `fast_forward`
    pub fast_forward: Option<bool>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a pattern does not compile or
    /// the chunk size is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        RefPattern::compile_all(&self.patterns)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        RefPattern::compile_all(&self.exclude_patterns)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        validate_chunk_size(self.chunk_size)
    }
}

fn validate_chunk_size(chunk_size: Option<usize>) -> Result<(), ConfigError> {
    if chunk_size == Some(0) {
        return Err(ConfigError::InvalidValue(
            "chunk_size must be at least 1".to_string(),
        ));
    }
    Ok(())
}
