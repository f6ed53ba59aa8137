//! engine::merge
//!
//! The octopus merge algorithm.
//!
//! # Algorithm
//!
//! ```text
//! all candidates already in HEAD            -> UpToDate
//! one independent head, HEAD its ancestor   -> FastForward
//! otherwise fold candidates into a session:
//!     already reachable -> contained, no new parent
//!     base  = merge_base(candidate, merge of parents so far)
//!     clean -> accept, tree advances, parent appended
//!     else  -> reject (strict: abort)
//! nested candidates are folded after the independent heads
//! no new parent after the fold              -> UpToDate
//! ```
//!
//! Everything happens on tree objects. The index, the working tree and every
//! ref are left alone; turning a plan into a commit is the commit builder's
//! job.
//!
//! A rejected branch is never retried against a later accumulator.

use tracing::{debug, info};

use crate::core::types::{BranchRef, Oid};
use crate::git::{GitError, RepoGateway, TreeMerge};

use super::runner::RunError;
use super::session::{MergeOutcome, MergeSession, Rejection};

/// Knobs of the merge algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Abort on the first rejected branch instead of excluding it.
    pub strict: bool,
    /// Allow a fast-forward when the candidates reduce to one descendant of HEAD.
    pub fast_forward: bool,
    /// Keep a merge whose tree equals HEAD's tree.
    pub allow_empty: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            fast_forward: true,
            allow_empty: true,
        }
    }
}

/// What the engine decided to do with a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
    /// Move HEAD's branch to `target` without a merge commit.
    FastForward {
        /// Branch whose commit HEAD advances to
        target: BranchRef,
    },
    /// Nothing to record.
    UpToDate {
        /// Branches whose content HEAD already has
        contained: Vec<BranchRef>,
        /// Branches excluded while finding that out
        rejected: Vec<Rejection>,
    },
    /// Record a merge commit from this session.
    Octopus(MergeSession),
}

/// Plan the merge of `candidates` into `head`.
///
/// `candidates` are attempted in the order given, except that a candidate
/// whose commit is an ancestor of another candidate's is deferred until the
/// others are folded. It is then usually reachable already and adds no
/// redundant parent; if its descendant was rejected it is attempted on its
/// own, after the independent heads.
///
/// # Errors
///
/// - [`RunError::Conflict`] or [`RunError::NoCommonAncestor`] on the first
///   rejection in strict mode
/// - [`RunError::NoBranchMerged`] when every candidate was rejected
/// - [`RunError::Repository`] when the gateway fails
pub fn merge<G: RepoGateway + ?Sized>(
    gateway: &G,
    head: &Oid,
    candidates: &[BranchRef],
    options: &MergeOptions,
) -> Result<MergePlan, RunError> {
    if all_contained(gateway, head, candidates)? {
        info!(%head, count = candidates.len(), "already up to date");
        return Ok(MergePlan::UpToDate {
            contained: candidates.to_vec(),
            rejected: Vec::new(),
        });
    }

    let subsumed = subsumed(gateway, candidates)?;

    if options.fast_forward {
        if let Some(target) = fast_forward_target(gateway, head, candidates, &subsumed)? {
            info!(%head, target = %target, "fast-forward");
            return Ok(MergePlan::FastForward { target });
        }
    }

    let (independent, deferred): (Vec<_>, Vec<_>) = candidates
        .iter()
        .zip(&subsumed)
        .partition(|(_, nested)| !**nested);

    let mut session = MergeSession::start(head.clone(), gateway.commit_tree(head)?);
    for (candidate, _) in independent.into_iter().chain(deferred) {
        let outcome = attempt(gateway, &session, candidate)?;
        debug!(branch = %candidate, ?outcome, "attempted");

        if options.strict {
            match &outcome {
                MergeOutcome::Conflicted { paths } => {
                    return Err(RunError::Conflict {
                        branch: candidate.name.to_string(),
                        paths: paths.clone(),
                    });
                }
                MergeOutcome::Unrelated => {
                    return Err(RunError::NoCommonAncestor {
                        branch: candidate.name.to_string(),
                    });
                }
                _ => {}
            }
        }

        session.record(candidate.clone(), outcome);
    }

    if session.accepted().is_empty() && session.contained().is_empty() {
        let (_, rejected) = session.into_leftovers();
        return Err(RunError::NoBranchMerged { rejected });
    }

    let nothing_new = session.accepted().is_empty();
    if nothing_new || (session.is_unchanged() && !options.allow_empty) {
        info!(nothing_new, "nothing to record");
        let accepted = session.accepted().to_vec();
        let (mut contained, rejected) = session.into_leftovers();
        contained.extend(accepted);
        return Ok(MergePlan::UpToDate {
            contained,
            rejected,
        });
    }

    Ok(MergePlan::Octopus(session))
}

/// Fold one candidate into the session's current state.
fn attempt<G: RepoGateway + ?Sized>(
    gateway: &G,
    session: &MergeSession,
    candidate: &BranchRef,
) -> Result<MergeOutcome, GitError> {
    for parent in session.parents() {
        if gateway.is_ancestor(&candidate.oid, parent)? {
            return Ok(MergeOutcome::AlreadyMerged);
        }
    }

    let theirs = gateway.commit_tree(&candidate.oid)?;
    if session.accepted().is_empty() && gateway.is_ancestor(session.start_commit(), &candidate.oid)? {
        return Ok(MergeOutcome::FastForwardOnly { tree: theirs });
    }

    let Some(base) = gateway.merge_base_many(&candidate.oid, session.parents())? else {
        return Ok(MergeOutcome::Unrelated);
    };
    let base_tree = gateway.commit_tree(&base)?;

    Ok(match gateway.merge_trees(&base_tree, session.tree(), &theirs)? {
        TreeMerge::Clean(tree) => MergeOutcome::Merged { tree },
        TreeMerge::Conflicted(paths) => MergeOutcome::Conflicted { paths },
    })
}

fn all_contained<G: RepoGateway + ?Sized>(
    gateway: &G,
    head: &Oid,
    candidates: &[BranchRef],
) -> Result<bool, GitError> {
    for candidate in candidates {
        if !gateway.is_ancestor(&candidate.oid, head)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// For each candidate, whether another candidate already carries it.
///
/// A candidate is subsumed when its commit is an ancestor of another
/// candidate's commit. Among candidates pointing at the same commit, all but
/// the first are subsumed.
fn subsumed<G: RepoGateway + ?Sized>(
    gateway: &G,
    candidates: &[BranchRef],
) -> Result<Vec<bool>, GitError> {
    let mut flags = Vec::with_capacity(candidates.len());
    'candidates: for (i, candidate) in candidates.iter().enumerate() {
        for (j, other) in candidates.iter().enumerate() {
            if i == j {
                continue;
            }
            let same = candidate.oid == other.oid;
            if (same && j < i) || (!same && gateway.is_ancestor(&candidate.oid, &other.oid)?) {
                flags.push(true);
                continue 'candidates;
            }
        }
        flags.push(false);
    }
    Ok(flags)
}

/// The single branch HEAD can fast-forward to, if the candidates reduce to one.
///
/// Candidates already contained in HEAD or subsumed by another candidate are
/// dropped first.
fn fast_forward_target<G: RepoGateway + ?Sized>(
    gateway: &G,
    head: &Oid,
    candidates: &[BranchRef],
    subsumed: &[bool],
) -> Result<Option<BranchRef>, GitError> {
    let mut independent: Vec<&BranchRef> = Vec::new();

    for (candidate, &nested) in candidates.iter().zip(subsumed) {
        if nested || gateway.is_ancestor(&candidate.oid, head)? {
            continue;
        }
        independent.push(candidate);
        if independent.len() > 1 {
            return Ok(None);
        }
    }

    match independent.as_slice() {
        [only] if gateway.is_ancestor(head, &only.oid)? => Ok(Some((*only).clone())),
        _ => Ok(None),
    }
}
