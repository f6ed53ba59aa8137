//! engine
//!
//! Orchestrates an octopus run: Resolve -> Merge -> Commit -> Publish.
//!
//! # Architecture
//!
//! - [`resolve`] turns patterns into an ordered candidate set
//! - [`merge`] decides between up-to-date, fast-forward and an octopus fold
//! - [`session`] holds the fold's accumulator
//! - [`commit`] writes the merge commit and moves the branch
//! - [`runner`] checks preconditions and sequences the above
//!
//! Every step talks to the repository through [`RepoGateway`], so the whole
//! engine runs unchanged against [`MockRepo`](crate::git::mock::MockRepo).
//!
//! # Invariants
//!
//! - Only [`commit::publish`] touches the working tree or moves a ref
//! - Any error leaves the checked-out branch where it was
//!
//! # Example
//!
//! ```
//! use git_octopus::engine::{run, RunOptions, RunOutcome};
//! use git_octopus::git::mock::MockRepo;
//!
//! let repo = MockRepo::new();
//! let root = repo.head();
//! let tip = repo.commit(&root, &[("foo", Some("1"))], "foo");
//! repo.set_branch("feature/foo", &tip);
//!
//! let options = RunOptions {
//!     patterns: vec!["feature/*".to_string()],
//!     ..RunOptions::default()
//! };
//! let result = run(&repo, &options).unwrap();
//! assert_eq!(result.outcome, RunOutcome::FastForwarded { to: tip });
//! ```
//!
//! [`RepoGateway`]: crate::git::RepoGateway

pub mod commit;
pub mod merge;
pub mod resolve;
pub mod runner;
pub mod session;

pub use commit::{MergeCommit, Publish};
pub use merge::{MergeOptions, MergePlan};
pub use resolve::resolve;
pub use runner::{run, RunError, RunOptions, RunOutcome, RunResult};
pub use session::{MergeOutcome, MergeSession, RejectReason, Rejection};

use std::path::PathBuf;

/// Execution context derived from global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Machine-readable output.
    pub json: bool,
}
