//! cli
//!
//! Command-line interface layer for git-octopus.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments
//! - Merge flags with configuration into [`RunOptions`]
//! - Print the report
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, opens the repository
//! and hands everything to [`crate::engine::run`].

pub mod args;

pub use args::Cli;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::engine::commit::TOOL_VERSION;
use crate::engine::{self, Context, RunOptions};
use crate::git::Git;
use crate::telemetry;
use crate::ui::output::{self, Verbosity};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    if cli.version {
        println!("{}", TOOL_VERSION);
        return Ok(());
    }
    telemetry::init(cli.debug);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        json: cli.json,
    };

    execute(&cli, &ctx)
}

fn execute(cli: &Cli, ctx: &Context) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet || ctx.json, ctx.debug);

    let cwd = match &ctx.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let git = Git::open(&cwd)?;
    output::debug(format!("repository: {}", git.git_dir().display()), verbosity);

    let config = Config::load(Some(git.git_dir())).context("failed to load configuration")?;
    log_config_sources(&config, verbosity);

    let options = run_options(cli, &config);
    output::debug(format!("patterns: {}", options.patterns.join(" ")), verbosity);

    let result = engine::run(&git, &options)?;

    if ctx.json {
        output::json(&result).context("failed to serialize result")?;
    } else {
        output::report(&result, verbosity);
    }

    Ok(())
}

/// Combine flags and configuration; flags win.
fn run_options(cli: &Cli, config: &Config) -> RunOptions {
    let patterns = if cli.patterns.is_empty() {
        config.patterns().to_vec()
    } else {
        cli.patterns.clone()
    };

    let mut excludes = config.exclude_patterns().to_vec();
    excludes.extend(cli.exclude.iter().cloned());

    RunOptions {
        patterns,
        excludes,
        strict: cli.strict || config.strict(),
        chunk_size: cli.chunk.or(config.chunk_size()),
        no_commit: cli.no_commit,
        allow_empty: config.allow_empty(),
        fast_forward: !cli.no_ff && config.fast_forward(),
    }
}

fn log_config_sources(config: &Config, verbosity: Verbosity) {
    let describe = |path: Option<&Path>| {
        path.map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("(none)"))
            .display()
            .to_string()
    };
    output::debug(
        format!("global config: {}", describe(config.global_config_loaded_from())),
        verbosity,
    );
    output::debug(
        format!("repo config: {}", describe(config.repo_config_loaded_from())),
        verbosity,
    );
}
