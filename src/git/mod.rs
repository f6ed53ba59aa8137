//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. The merge engine works against the
//! [`RepoGateway`] trait; [`Git`] implements it on top of libgit2 and
//! [`mock::MockRepo`] implements it in memory. No other module imports `git2`.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Branch listing and ref resolution
//! - Ancestry queries (merge-base, is-ancestor)
//! - In-memory tree merges and commit creation
//! - CAS ref updates and working tree checkout
//! - Status and state detection
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - Tree merges never touch the index or working tree
//! - All operations return strong types (Oid, RefName, BranchRef)
//!
//! # Example
//!
//! ```ignore
//! use git_octopus::git::{Git, RepoGateway};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//!
//! let head = git.current_branch()?;
//! let branches = git.list_branch_refs()?;
//!
//! // CAS update (fails if ref changed since read)
//! git.update_ref(&head.name, &head.oid, &new_oid, "git-octopus: merge")?;
//! ```

pub mod gateway;
mod interface;
pub mod mock;

pub use gateway::{RepoGateway, Signature, TreeMerge};
pub use interface::{Git, GitError, GitState, WorktreeStatus};
