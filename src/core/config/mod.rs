//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! git-octopus has two configuration scopes:
//! - **Global**: User-level merge defaults
//! - **Repo**: Default patterns and repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (applied by the caller)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GIT_OCTOPUS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-octopus/config.toml`
//! 3. `~/.git-octopus/config.toml`
//!
//! # Repo Config Location
//!
//! `<git_dir>/octopus/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use git_octopus::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("strict: {}", config.strict());
//! for pattern in config.patterns() {
//!     println!("default pattern: {}", pattern);
//! }
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules: repo config overrides global config,
/// and unset values fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if present)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `git_dir` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_global(Self::find_global(), git_dir)
    }

    /// Load configuration using an explicit global config path.
    ///
    /// `global` is ignored when it does not exist.
    pub fn load_with_global(
        global: Option<PathBuf>,
        git_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let (global, global_path) = match global.filter(|p| p.exists()) {
            Some(path) => (read_toml::<GlobalConfig>(&path)?, Some(path)),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path) = match git_dir.map(Self::repo_config_path) {
            Some(path) if path.exists() => (Some(read_toml::<RepoConfig>(&path)?), Some(path)),
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GIT_OCTOPUS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("git-octopus/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".git-octopus/config.toml"))
            .filter(|path| path.exists())
    }

    /// Get the path of the repo config file for a `.git` directory.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("octopus/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Default include patterns. Empty if not configured.
    pub fn patterns(&self) -> &[String] {
        self.repo.as_ref().map(|r| r.patterns.as_slice()).unwrap_or(&[])
    }

    /// Configured exclude patterns. Empty if not configured.
    pub fn exclude_patterns(&self) -> &[String] {
        self.repo
            .as_ref()
            .map(|r| r.exclude_patterns.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a conflict aborts the whole run.
    ///
    /// Defaults to `false`.
    pub fn strict(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.strict)
            .or(self.global.strict)
            .unwrap_or(false)
    }

    /// Chunk size, if chunked merging is configured.
    pub fn chunk_size(&self) -> Option<usize> {
        self.repo
            .as_ref()
            .and_then(|r| r.chunk_size)
            .or(self.global.chunk_size)
    }

    /// Whether a merge that changes no content still records a commit.
    ///
    /// Defaults to `true`.
    pub fn allow_empty(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.allow_empty)
            .or(self.global.allow_empty)
            .unwrap_or(true)
    }

    /// Whether a single head ahead of HEAD is fast-forwarded.
    ///
    /// Defaults to `true`.
    pub fn fast_forward(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.fast_forward)
            .or(self.global.fast_forward)
            .unwrap_or(true)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
