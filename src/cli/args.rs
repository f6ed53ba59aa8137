//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version` / `-v`: Show version
//! - `--exclude` / `-e`: Exclude matching branches (repeatable)
//! - `--no-commit` / `-n`: Compute the merge without writing anything
//! - `--chunk` / `-s`: Merge in chunks of N branches
//! - `--strict`, `--no-ff`, `--json`
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Merge every branch matching a pattern into one octopus commit
#[derive(Parser, Debug)]
#[command(name = "git-octopus")]
#[command(about, long_about = None, disable_version_flag = true)]
#[command(after_help = "\
EXAMPLES:
    # Merge every feature branch into the current branch
    git-octopus 'feature/*'

    # Everything under feature/ and fix/, except work in progress
    git-octopus 'feature/*' 'fix/*' -e '*wip*'

    # See what would happen without touching anything
    git-octopus -n 'feature/*'

    # One commit per 10 branches
    git-octopus -s 10 'feature/*'

PATTERNS:
    Shell globs matched against short branch names (feature/x, origin/x).
    '*' also matches '/'. A pattern starting with refs/ matches the full ref.
    Without patterns, the repository's configured patterns are used.")]
pub struct Cli {
    /// Branch patterns to merge
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Print version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Exclude branches matching this pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Compute and report the merge without committing
    #[arg(short = 'n', long)]
    pub no_commit: bool,

    /// Merge in chunks of at most N branches, one commit per chunk
    #[arg(
        short = 's',
        long = "chunk",
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub chunk: Option<usize>,

    /// Abort on the first conflict instead of excluding the branch
    #[arg(long)]
    pub strict: bool,

    /// Always create a merge commit, even when a fast-forward is possible
    #[arg(long)]
    pub no_ff: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Run as if git-octopus was started in this directory
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("git-octopus").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn patterns_and_excludes() {
        let cli = parse(&["feature/*", "fix/*", "-e", "wip", "--exclude", "old*"]);
        assert_eq!(cli.patterns, ["feature/*", "fix/*"]);
        assert_eq!(cli.exclude, ["wip", "old*"]);
    }

    #[test]
    fn short_flags() {
        let cli = parse(&["-n", "-s", "5", "-q", "x"]);
        assert!(cli.no_commit);
        assert_eq!(cli.chunk, Some(5));
        assert!(cli.quiet);
    }

    #[test]
    fn zero_chunk_rejected() {
        let result = Cli::try_parse_from(["git-octopus", "-s", "0", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn version_flag() {
        assert!(parse(&["-v"]).version);
        assert!(parse(&["--version"]).version);
        assert!(!parse(&["x"]).version);
    }

    #[test]
    fn chunk_parses_as_usize() {
        let cli = parse(&["--chunk", "12", "x"]);
        assert_eq!(cli.chunk, Some(12usize));
    }

    #[test]
    fn no_patterns_is_allowed() {
        let cli = parse(&[]);
        assert!(cli.patterns.is_empty());
    }
}
