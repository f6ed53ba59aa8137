//! engine::runner
//!
//! The single entry point for an octopus run.
//!
//! # Lifecycle
//!
//! ```text
//! Preconditions -> Resolve -> Merge (per chunk) -> Commit -> Publish -> Report
//! ```
//!
//! # Invariants
//!
//! - Nothing is written before every precondition holds
//! - The branch ref moves at most once, after the working tree is updated
//! - On any error the branch ref holds the value it had when the run started
//! - Per-branch rejections are reported in [`RunResult`], not as errors
//!   (except in strict mode)

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::ConfigError;
use crate::core::pattern::PatternSyntaxError;
use crate::core::types::{BranchRef, Oid};
use crate::git::{GitError, RepoGateway};

use super::commit::{self, MergeCommit, Publish};
use super::merge::{self, MergeOptions, MergePlan};
use super::resolve::resolve;
use super::session::Rejection;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// No pattern on the command line and none configured.
    #[error("no branch pattern given and none configured")]
    NoPatterns,

    /// A pattern is not a valid glob.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The patterns select no branch.
    #[error("no branch matches {}", .patterns.join(" "))]
    NoMatchingBranches { patterns: Vec<String> },

    /// Strict mode hit a conflict.
    #[error("merge of {branch} conflicts in {}", .paths.join(", "))]
    Conflict { branch: String, paths: Vec<String> },

    /// Strict mode hit a branch sharing no history with HEAD.
    #[error("{branch} has no common ancestor with the merge")]
    NoCommonAncestor { branch: String },

    /// Every candidate was rejected.
    #[error("no branch could be merged: {}", describe(.rejected))]
    NoBranchMerged { rejected: Vec<Rejection> },

    /// The index or working tree has uncommitted changes.
    #[error("working tree is not clean: {details}")]
    DirtyWorkingTree { details: String },

    /// HEAD is not on a branch.
    #[error("HEAD is detached; check out the branch to merge into")]
    DetachedHead,

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] GitError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<PatternSyntaxError> for RunError {
    fn from(err: PatternSyntaxError) -> Self {
        RunError::InvalidPattern {
            pattern: err.pattern,
            message: err.message,
        }
    }
}

fn describe(rejected: &[Rejection]) -> String {
    rejected
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything a run needs to know, after config and flags are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Include patterns
    pub patterns: Vec<String>,
    /// Exclude patterns
    pub excludes: Vec<String>,
    /// Abort on the first rejected branch
    pub strict: bool,
    /// Merge in chunks of this many branches
    pub chunk_size: Option<usize>,
    /// Compute and report, write nothing
    pub no_commit: bool,
    /// Record merges that leave the tree unchanged
    pub allow_empty: bool,
    /// Fast-forward when possible
    pub fast_forward: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            excludes: Vec::new(),
            strict: false,
            chunk_size: None,
            no_commit: false,
            allow_empty: true,
            fast_forward: true,
        }
    }
}

impl RunOptions {
    fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            strict: self.strict,
            fast_forward: self.fast_forward,
            allow_empty: self.allow_empty,
        }
    }
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The branch advanced to an existing commit.
    FastForwarded {
        /// New branch tip
        to: Oid,
    },
    /// The branch advanced to a new merge commit.
    Merged {
        /// New branch tip
        commit: Oid,
    },
    /// Nothing to do.
    UpToDate,
    /// Nothing written; this is the tree the merge would produce.
    DryRun {
        /// Resulting tree
        tree: Oid,
    },
}

/// Report of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Branch merged into
    pub branch: BranchRef,
    /// Branches merged by this run, in merge order
    pub merged: Vec<BranchRef>,
    /// Branches the branch already contained
    pub contained: Vec<BranchRef>,
    /// Branches left out, with the reason
    pub excluded: Vec<Rejection>,
    /// Commits written, oldest first
    pub commits: Vec<MergeCommit>,
}

impl RunResult {
    /// Check whether some branches were left out.
    pub fn has_warnings(&self) -> bool {
        !self.excluded.is_empty()
    }
}

/// Run an octopus merge into the checked-out branch.
///
/// # Errors
///
/// Returns a [`RunError`] for every failure; in that case the checked-out
/// branch and working tree have not moved. Commit objects written for earlier
/// chunks before the failure stay in the object database, unreferenced, until
/// git garbage-collects them.
pub fn run<G: RepoGateway + ?Sized>(gateway: &G, options: &RunOptions) -> Result<RunResult, RunError> {
    // 1. Preconditions
    let state = gateway.state();
    if state.is_in_progress() {
        return Err(GitError::OperationInProgress { operation: state }.into());
    }

    let head = gateway.current_branch().map_err(|e| match e {
        GitError::DetachedHead => RunError::DetachedHead,
        other => RunError::Repository(other),
    })?;

    if !gateway.is_worktree_clean()? {
        return Err(RunError::DirtyWorkingTree {
            details: "commit or stash your changes first".to_string(),
        });
    }

    // 2. Resolve
    let candidates = resolve(gateway, &options.patterns, &options.excludes, &head.name)?;
    info!(branch = %head, count = candidates.len(), "resolved candidates");

    let merge_options = options.merge_options();

    // 3. Dry run: one fold over everything, nothing written
    if options.no_commit {
        return dry_run(gateway, head, &candidates, &merge_options);
    }

    // 4. Merge chunk by chunk, each on top of the previous result
    let chunk_len = options
        .chunk_size
        .filter(|n| *n > 0)
        .unwrap_or(candidates.len())
        .max(1);

    let mut tip = head.oid.clone();
    let mut merged = Vec::new();
    let mut contained = Vec::new();
    let mut excluded = Vec::new();
    let mut commits = Vec::new();
    let mut signature = None;

    for chunk in candidates.chunks(chunk_len) {
        debug!(tip = %tip, size = chunk.len(), "merging chunk");
        match merge::merge(gateway, &tip, chunk, &merge_options) {
            Ok(MergePlan::UpToDate {
                contained: already,
                rejected,
            }) => {
                contained.extend(already);
                excluded.extend(rejected);
            }
            Ok(MergePlan::FastForward { target }) => {
                let (new, already) = split_contained(gateway, &tip, chunk)?;
                merged.extend(new);
                contained.extend(already);
                tip = target.oid;
            }
            Ok(MergePlan::Octopus(session)) => {
                let author = match signature.take() {
                    Some(author) => author,
                    None => gateway.signature()?,
                };
                let commit = commit::build(gateway, &session, &author)?;
                signature = Some(author);
                tip = commit.oid.clone();
                merged.extend_from_slice(session.accepted());
                contained.extend_from_slice(session.contained());
                excluded.extend_from_slice(session.rejected());
                commits.push(commit);
            }
            Err(RunError::NoBranchMerged { rejected }) => excluded.extend(rejected),
            Err(err) => return Err(err),
        }
    }

    if merged.is_empty() && contained.is_empty() && !excluded.is_empty() {
        return Err(RunError::NoBranchMerged { rejected: excluded });
    }

    // 5. Publish
    let outcome = if tip == head.oid {
        RunOutcome::UpToDate
    } else {
        let old_tree = gateway.commit_tree(&head.oid)?;
        let new_tree = gateway.commit_tree(&tip)?;
        commit::publish(
            gateway,
            &Publish {
                branch: &head.name,
                old_tip: &head.oid,
                old_tree: &old_tree,
                new_tip: &tip,
                new_tree: &new_tree,
            },
        )?;
        if commits.is_empty() {
            RunOutcome::FastForwarded { to: tip }
        } else {
            RunOutcome::Merged { commit: tip }
        }
    };

    Ok(RunResult {
        outcome,
        branch: head,
        merged,
        contained,
        excluded,
        commits,
    })
}

fn dry_run<G: RepoGateway + ?Sized>(
    gateway: &G,
    head: BranchRef,
    candidates: &[BranchRef],
    options: &MergeOptions,
) -> Result<RunResult, RunError> {
    let (outcome, merged, contained, excluded) =
        match merge::merge(gateway, &head.oid, candidates, options)? {
            MergePlan::UpToDate {
                contained,
                rejected,
            } => (RunOutcome::UpToDate, Vec::new(), contained, rejected),
            MergePlan::FastForward { target } => {
                let (merged, contained) = split_contained(gateway, &head.oid, candidates)?;
                let tree = gateway.commit_tree(&target.oid)?;
                (RunOutcome::DryRun { tree }, merged, contained, Vec::new())
            }
            MergePlan::Octopus(session) => {
                let tree = session.tree().clone();
                let merged = session.accepted().to_vec();
                let (contained, rejected) = session.into_leftovers();
                (RunOutcome::DryRun { tree }, merged, contained, rejected)
            }
        };

    Ok(RunResult {
        outcome,
        branch: head,
        merged,
        contained,
        excluded,
        commits: Vec::new(),
    })
}

/// Split `branches` into those `tip` does not contain yet and those it does.
fn split_contained<G: RepoGateway + ?Sized>(
    gateway: &G,
    tip: &Oid,
    branches: &[BranchRef],
) -> Result<(Vec<BranchRef>, Vec<BranchRef>), GitError> {
    let mut new = Vec::new();
    let mut already = Vec::new();
    for branch in branches {
        if gateway.is_ancestor(&branch.oid, tip)? {
            already.push(branch.clone());
        } else {
            new.push(branch.clone());
        }
    }
    Ok((new, already))
}
