//! git::gateway
//!
//! The repository operations the merge engine consumes.
//!
//! # Architecture
//!
//! The engine never talks to libgit2 directly. It asks a [`RepoGateway`] for
//! refs, ancestry, tree merges, commit objects and ref updates. [`Git`] is the
//! production implementation; [`MockRepo`] is an in-memory implementation
//! used to test the engine without an on-disk repository.
//!
//! # Invariants
//!
//! - `merge_trees` and `write_commit` only create objects; they never move a
//!   ref or touch the working tree
//! - `update_ref` is compare-and-swap: it fails with [`GitError::CasFailed`]
//!   when the ref no longer holds `from`
//!
//! [`Git`]: super::Git
//! [`MockRepo`]: super::mock::MockRepo

use crate::core::pattern::RefPattern;
use crate::core::types::{BranchRef, Oid, RefName};

use super::{GitError, GitState};

/// Author and committer identity for new commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

impl Signature {
    /// Create a signature.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Result of a three-way tree merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeMerge {
    /// The merge resolved every path; the merged tree has been written.
    Clean(Oid),
    /// Some paths could not be resolved. Nothing was written.
    Conflicted(Vec<String>),
}

impl TreeMerge {
    /// Check whether the merge left unresolved paths.
    pub fn has_conflicts(&self) -> bool {
        matches!(self, TreeMerge::Conflicted(_))
    }
}

/// Repository operations required to plan and record an octopus merge.
pub trait RepoGateway {
    /// Current repository state (rebase, merge, ... in progress).
    fn state(&self) -> GitState;

    /// Every branch that may be merged: local branches and remote-tracking
    /// branches, each resolved to its commit.
    fn list_branch_refs(&self) -> Result<Vec<BranchRef>, GitError>;

    /// Branch refs selected by `pattern`.
    fn list_refs_matching(&self, pattern: &RefPattern) -> Result<Vec<BranchRef>, GitError> {
        Ok(self
            .list_branch_refs()?
            .into_iter()
            .filter(|branch| pattern.matches(&branch.name))
            .collect())
    }

    /// The checked-out branch and the commit it points at.
    ///
    /// # Errors
    ///
    /// [`GitError::DetachedHead`] when HEAD is not on a branch.
    fn current_branch(&self) -> Result<BranchRef, GitError>;

    /// Check if `ancestor` is an ancestor of (or equal to) `descendant`.
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError>;

    /// Best common ancestor of two commits, `None` for unrelated histories.
    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError>;

    /// Best common ancestor of `commit` and a hypothetical merge of `others`.
    fn merge_base_many(&self, commit: &Oid, others: &[Oid]) -> Result<Option<Oid>, GitError>;

    /// Tree of a commit.
    fn commit_tree(&self, commit: &Oid) -> Result<Oid, GitError>;

    /// Three-way merge of two trees against a base tree.
    fn merge_trees(&self, base: &Oid, ours: &Oid, theirs: &Oid) -> Result<TreeMerge, GitError>;

    /// Identity used for new commits.
    fn signature(&self) -> Result<Signature, GitError>;

    /// Write a commit object. Does not move any ref.
    fn write_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid, GitError>;

    /// Move `refname` from `from` to `to`, failing if it no longer holds `from`.
    fn update_ref(
        &self,
        refname: &RefName,
        from: &Oid,
        to: &Oid,
        reflog_message: &str,
    ) -> Result<(), GitError>;

    /// Make the index and working tree match `tree`.
    ///
    /// Without `force`, files whose content differs from the current HEAD are
    /// left alone and the checkout fails instead of overwriting them.
    fn checkout_tree(&self, tree: &Oid, force: bool) -> Result<(), GitError>;

    /// Check if the index and working tree match HEAD (untracked files ignored).
    fn is_worktree_clean(&self) -> Result<bool, GitError>;
}
