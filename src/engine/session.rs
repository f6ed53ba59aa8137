//! engine::session
//!
//! The accumulator of an octopus merge.
//!
//! # Design
//!
//! A [`MergeSession`] starts at the checked-out commit and absorbs candidate
//! branches one at a time. Each attempt ends in a [`MergeOutcome`]; the
//! session turns it into an accepted branch (tree advanced, parent appended),
//! a contained branch (already reachable, nothing changes) or a
//! [`Rejection`] (tree unchanged).
//!
//! # Invariants
//!
//! - `parents()[0]` is always the starting commit
//! - `parents()[1..]` are exactly the accepted branches' commits, in
//!   acceptance order
//! - Neither a contained nor a rejected branch changes the accumulated tree

use serde::Serialize;

use crate::core::types::{BranchRef, Oid};

/// Result of folding one branch into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Three-way merge succeeded with the given tree.
    Merged {
        /// Merged tree
        tree: Oid,
    },
    /// Three-way merge left unresolved paths.
    Conflicted {
        /// Conflicting paths
        paths: Vec<String>,
    },
    /// The branch shares no history with the accumulator.
    Unrelated,
    /// Nothing accumulated yet and the branch descends from the starting
    /// commit: its tree is taken as is.
    FastForwardOnly {
        /// The branch's tree
        tree: Oid,
    },
    /// The branch's commit is already reachable from a parent.
    AlreadyMerged,
}

/// Why a branch was left out of the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Merging the branch produced conflicts.
    Conflict {
        /// Conflicting paths
        paths: Vec<String>,
    },
    /// The branch has no merge base with the accumulator.
    NoCommonAncestor,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Conflict { paths } if paths.is_empty() => write!(f, "conflict"),
            RejectReason::Conflict { paths } => write!(f, "conflict in {}", paths.join(", ")),
            RejectReason::NoCommonAncestor => write!(f, "no common ancestor"),
        }
    }
}

/// A branch excluded from the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// The excluded branch
    pub branch: BranchRef,
    /// Why it was excluded
    #[serde(flatten)]
    pub reason: RejectReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.branch.short_name(), self.reason)
    }
}

/// Accumulator for one octopus merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSession {
    start_tree: Oid,
    tree: Oid,
    accepted: Vec<BranchRef>,
    contained: Vec<BranchRef>,
    rejected: Vec<Rejection>,
    parents: Vec<Oid>,
}

impl MergeSession {
    /// Start a session at `commit`, whose tree is `tree`.
    pub fn start(commit: Oid, tree: Oid) -> Self {
        Self {
            start_tree: tree.clone(),
            tree,
            accepted: Vec::new(),
            contained: Vec::new(),
            rejected: Vec::new(),
            parents: vec![commit],
        }
    }

    /// Commit the session started from.
    pub fn start_commit(&self) -> &Oid {
        &self.parents[0]
    }

    /// Tree of the starting commit.
    pub fn start_tree(&self) -> &Oid {
        &self.start_tree
    }

    /// Accumulated tree.
    pub fn tree(&self) -> &Oid {
        &self.tree
    }

    /// Parents of the commit this session would produce.
    pub fn parents(&self) -> &[Oid] {
        &self.parents
    }

    /// Accepted branches, in acceptance order. One per parent after the first.
    pub fn accepted(&self) -> &[BranchRef] {
        &self.accepted
    }

    /// Branches that were already reachable from a parent when attempted.
    pub fn contained(&self) -> &[BranchRef] {
        &self.contained
    }

    /// Rejected branches, in attempt order.
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    /// Check whether the accumulated tree still equals the starting tree.
    pub fn is_unchanged(&self) -> bool {
        self.tree == self.start_tree
    }

    /// Apply the outcome of attempting `branch`.
    ///
    /// Returns `true` if the branch added a parent.
    pub fn record(&mut self, branch: BranchRef, outcome: MergeOutcome) -> bool {
        match outcome {
            MergeOutcome::Merged { tree } | MergeOutcome::FastForwardOnly { tree } => {
                self.tree = tree;
                self.parents.push(branch.oid.clone());
                self.accepted.push(branch);
                true
            }
            MergeOutcome::AlreadyMerged => {
                self.contained.push(branch);
                false
            }
            MergeOutcome::Conflicted { paths } => {
                self.rejected.push(Rejection {
                    branch,
                    reason: RejectReason::Conflict { paths },
                });
                false
            }
            MergeOutcome::Unrelated => {
                self.rejected.push(Rejection {
                    branch,
                    reason: RejectReason::NoCommonAncestor,
                });
                false
            }
        }
    }

    /// Take the contained and rejected branches out of the session.
    pub fn into_leftovers(self) -> (Vec<BranchRef>, Vec<Rejection>) {
        (self.contained, self.rejected)
    }
}
