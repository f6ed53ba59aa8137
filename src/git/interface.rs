//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the on-disk repository.
//! All reads and writes flow through [`Git`], which returns strong types and
//! normalizes libgit2 errors into typed failure categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::DetachedHead`]: HEAD does not point at a branch
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//!
//! # Example
//!
//! ```ignore
//! use git_octopus::git::{Git, RepoGateway};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.current_branch()?;
//! println!("{} is at {}", head.name, head.oid.short(7));
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchRef, Oid, RefName, TypeError, HEADS_PREFIX, REMOTES_PREFIX};

use super::gateway::{RepoGateway, Signature, TreeMerge};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// HEAD is detached or unborn.
    #[error("HEAD is not on a branch")]
    DetachedHead,

    /// Compare-and-swap precondition failed.
    ///
    /// The ref moved between the moment it was read and the moment it was
    /// updated, typically because another process changed it.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress {
        /// The type of operation in progress
        operation: GitState,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// No committer identity configured.
    #[error("no commit identity configured (set user.name and user.email): {message}")]
    MissingIdentity {
        /// libgit2's explanation
        message: String,
    },

    /// Checkout refused to overwrite local changes.
    #[error("checkout failed: {message}")]
    CheckoutFailed {
        /// Description of the problem
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            git2::ErrorCode::Conflict => GitError::CheckoutFailed {
                message: format!("{}: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// State of in-progress Git operations.
///
/// An octopus merge refuses to start while any of these is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge in progress.
    Merge,

    /// Cherry-pick in progress.
    CherryPick,

    /// Revert in progress.
    Revert,

    /// Bisect in progress.
    Bisect,

    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use git_octopus::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase { .. } => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is clean. Untracked files do not count.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

/// The Git interface.
///
/// This is the **single point of interaction** with the on-disk repository.
/// No other module imports `git2`.
///
/// # CAS Semantics
///
/// Ref updates only succeed if the ref's current value matches the value the
/// caller read at the start of the run. A branch moved by another process
/// mid-run is reported instead of overwritten.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

/// Convert a validated Oid into a git2 Oid.
fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

/// Convert a git2 Oid into a validated Oid.
fn from_git2(oid: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(oid.to_string()).map_err(|e| e.into())
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Path of the `.git` directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    fn read_state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => {
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Read rebase progress from .git/rebase-merge or .git/rebase-apply.
    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let git_dir = self.repo.path();
        let read_num = |path: PathBuf| -> Option<usize> {
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| s.trim().parse().ok())
        };

        let rebase_merge = git_dir.join("rebase-merge");
        if rebase_merge.exists() {
            return (
                read_num(rebase_merge.join("msgnum")),
                read_num(rebase_merge.join("end")),
            );
        }

        let rebase_apply = git_dir.join("rebase-apply");
        if rebase_apply.exists() {
            return (
                read_num(rebase_apply.join("next")),
                read_num(rebase_apply.join("last")),
            );
        }

        (None, None)
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// Get working tree status summary. Untracked and ignored files are skipped.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }

            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }

            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }

        Ok(result)
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Target of a ref without peeling, used for CAS comparisons.
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    fn find_tree(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.repo
            .find_tree(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// Collect the paths of every conflict recorded in an in-memory index.
    fn conflict_paths(index: &git2::Index) -> Result<Vec<String>, GitError> {
        let mut paths = BTreeSet::new();
        let conflicts = index.conflicts().map_err(|e| GitError::from_git2(e, "index"))?;
        for conflict in conflicts {
            let conflict = conflict.map_err(|e| GitError::from_git2(e, "index"))?;
            for entry in [conflict.ancestor, conflict.our, conflict.their]
                .into_iter()
                .flatten()
            {
                let path = String::from_utf8_lossy(&entry.path).into_owned();
                if !path.is_empty() {
                    paths.insert(path);
                }
            }
        }
        Ok(paths.into_iter().collect())
    }
}

impl RepoGateway for Git {
    fn state(&self) -> GitState {
        self.read_state()
    }

    fn list_branch_refs(&self) -> Result<Vec<BranchRef>, GitError> {
        let references = self
            .repo
            .references()
            .map_err(|e| GitError::from_git2(e, "refs"))?;

        let mut branches = Vec::new();
        for reference in references {
            let reference = reference.map_err(|e| GitError::from_git2(e, "refs"))?;

            // refs/remotes/<remote>/HEAD is a symbolic alias, not a branch
            if reference.kind() == Some(git2::ReferenceType::Symbolic) {
                continue;
            }

            let Some(name) = reference.name() else {
                continue;
            };
            if !name.starts_with(HEADS_PREFIX) && !name.starts_with(REMOTES_PREFIX) {
                continue;
            }
            let Ok(ref_name) = RefName::new(name) else {
                continue;
            };
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };

            branches.push(BranchRef::new(ref_name, from_git2(commit.id())?));
        }

        Ok(branches)
    }

    fn current_branch(&self) -> Result<BranchRef, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                return Err(GitError::RefNotFound {
                    refname: "HEAD".to_string(),
                })
            }
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }

        let name = head.name().ok_or(GitError::DetachedHead)?;
        let ref_name = RefName::new(name)?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, name))?;

        Ok(BranchRef::new(ref_name, from_git2(commit.id())?))
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        // A commit is its own ancestor
        if ancestor == descendant {
            return Ok(true);
        }

        self.repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)
            .map_err(|e| GitError::from_git2(e, descendant.as_str()))
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2(a)?, to_git2(b)?) {
            Ok(oid) => Ok(Some(from_git2(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, "merge-base")),
        }
    }

    fn merge_base_many(&self, commit: &Oid, others: &[Oid]) -> Result<Option<Oid>, GitError> {
        // libgit2 compares the first commit against a hypothetical merge of
        // the rest, which is what folding onto an accumulator needs.
        let mut oids = Vec::with_capacity(others.len() + 1);
        oids.push(to_git2(commit)?);
        for other in others {
            oids.push(to_git2(other)?);
        }

        match self.repo.merge_base_many(&oids) {
            Ok(oid) => Ok(Some(from_git2(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, "merge-base")),
        }
    }

    fn commit_tree(&self, commit: &Oid) -> Result<Oid, GitError> {
        let found = self
            .repo
            .find_commit(to_git2(commit)?)
            .map_err(|e| GitError::from_git2(e, commit.as_str()))?;
        from_git2(found.tree_id())
    }

    fn merge_trees(&self, base: &Oid, ours: &Oid, theirs: &Oid) -> Result<TreeMerge, GitError> {
        let base_tree = self.find_tree(base)?;
        let our_tree = self.find_tree(ours)?;
        let their_tree = self.find_tree(theirs)?;

        let mut opts = git2::MergeOptions::new();
        opts.fail_on_conflict(false);

        let mut index = self
            .repo
            .merge_trees(&base_tree, &our_tree, &their_tree, Some(&opts))
            .map_err(|e| GitError::from_git2(e, "merge-trees"))?;

        if index.has_conflicts() {
            return Ok(TreeMerge::Conflicted(Self::conflict_paths(&index)?));
        }

        let tree = index
            .write_tree_to(&self.repo)
            .map_err(|e| GitError::from_git2(e, "write-tree"))?;
        Ok(TreeMerge::Clean(from_git2(tree)?))
    }

    fn signature(&self) -> Result<Signature, GitError> {
        let sig = self.repo.signature().map_err(|e| GitError::MissingIdentity {
            message: e.message().to_string(),
        })?;
        Ok(Signature::new(
            sig.name().unwrap_or_default(),
            sig.email().unwrap_or_default(),
        ))
    }

    fn write_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid, GitError> {
        let sig = git2::Signature::now(&author.name, &author.email).map_err(|e| {
            GitError::MissingIdentity {
                message: e.message().to_string(),
            }
        })?;

        let tree = self.find_tree(tree)?;

        let parent_commits = parents
            .iter()
            .map(|p| {
                self.repo
                    .find_commit(to_git2(p)?)
                    .map_err(|e| GitError::from_git2(e, p.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

        let oid = self
            .repo
            .commit(None, &sig, &sig, message, &tree, &parent_refs)
            .map_err(|e| GitError::from_git2(e, "commit"))?;
        from_git2(oid)
    }

    fn update_ref(
        &self,
        refname: &RefName,
        from: &Oid,
        to: &Oid,
        reflog_message: &str,
    ) -> Result<(), GitError> {
        let name = refname.as_str();
        let current = self.try_resolve_ref_raw(name)?;

        match current {
            Some(actual) if actual == from.as_str() => {}
            other => {
                return Err(GitError::CasFailed {
                    refname: name.to_string(),
                    expected: from.to_string(),
                    actual: other.unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }

        // reference_matching repeats the comparison under the ref lock, which
        // closes the window between the read above and the write.
        self.repo
            .reference_matching(name, to_git2(to)?, true, to_git2(from)?, reflog_message)
            .map_err(|e| match e.code() {
                git2::ErrorCode::Modified => GitError::CasFailed {
                    refname: name.to_string(),
                    expected: from.to_string(),
                    actual: "<changed concurrently>".to_string(),
                },
                _ => GitError::from_git2(e, name),
            })?;

        Ok(())
    }

    fn checkout_tree(&self, tree: &Oid, force: bool) -> Result<(), GitError> {
        let tree = self.find_tree(tree)?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        if force {
            checkout.force();
        } else {
            checkout.safe();
        }

        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "checkout"))
    }

    fn is_worktree_clean(&self) -> Result<bool, GitError> {
        Ok(self.worktree_status()?.is_clean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn cas_display_names_ref() {
            let err = GitError::CasFailed {
                refname: "refs/heads/main".to_string(),
                expected: "abc".to_string(),
                actual: "def".to_string(),
            };
            assert!(err.to_string().contains("CAS failed"));
            assert!(err.to_string().contains("refs/heads/main"));
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidOid("bad".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
            let err: GitError = TypeError::InvalidRefName("bad".into()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
        }

        #[test]
        fn not_found_context_decides_variant() {
            let raw = git2::Error::new(
                git2::ErrorCode::NotFound,
                git2::ErrorClass::Reference,
                "missing",
            );
            assert!(matches!(
                GitError::from_git2(raw, "refs/heads/gone"),
                GitError::RefNotFound { .. }
            ));

            let raw = git2::Error::new(
                git2::ErrorCode::NotFound,
                git2::ErrorClass::Odb,
                "missing",
            );
            assert!(matches!(
                GitError::from_git2(raw, "abc123"),
                GitError::ObjectNotFound { .. }
            ));
        }
    }

    mod git_state {
        use super::*;

        #[test]
        fn operations_are_in_progress() {
            assert!(!GitState::Clean.is_in_progress());
            assert!(GitState::Merge.is_in_progress());
            assert!(GitState::CherryPick.is_in_progress());
            assert!(GitState::Rebase {
                current: None,
                total: None
            }
            .is_in_progress());
        }

        #[test]
        fn display_formatting() {
            assert_eq!(format!("{}", GitState::Clean), "clean");
            assert_eq!(
                format!(
                    "{}",
                    GitState::Rebase {
                        current: Some(2),
                        total: Some(5)
                    }
                ),
                "rebase (2/5)"
            );
        }
    }

    mod worktree_status {
        use super::*;

        #[test]
        fn default_is_clean() {
            let status = WorktreeStatus::default();
            assert!(status.is_clean());
        }

        #[test]
        fn any_dirty_part_is_not_clean() {
            let staged = WorktreeStatus {
                staged: 1,
                ..Default::default()
            };
            let conflicted = WorktreeStatus {
                has_conflicts: true,
                ..Default::default()
            };
            assert!(!staged.is_clean());
            assert!(!conflicted.is_clean());
        }
    }
}
