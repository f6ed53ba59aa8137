//! engine::commit
//!
//! Turns a merge session into a commit and makes it the branch tip.
//!
//! # Publishing
//!
//! ```text
//! checkout new tree (safe, HEAD still at old tip)
//!   -> CAS branch ref old tip -> new tip
//!        failure: force checkout old tree, report error
//! ```
//!
//! The branch ref moves at most once per run, and only after the working tree
//! already holds the new content.

use serde::Serialize;
use tracing::{info, warn};

use crate::core::types::{BranchRef, Oid, RefName};
use crate::git::{GitError, RepoGateway, Signature};

use super::session::MergeSession;

/// Name written into commit messages and reflogs.
pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");

/// Version printed by `--version` and written into commit messages:
/// major and minor only.
pub const TOOL_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR")
);

/// A merge commit written by this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeCommit {
    /// Commit id
    pub oid: Oid,
    /// Tree id
    pub tree: Oid,
    /// Parents, starting with the previous branch tip
    pub parents: Vec<Oid>,
    /// Full commit message
    pub message: String,
}

/// Commit message for merging `branches`.
///
/// ```
/// use git_octopus::core::types::{BranchRef, Oid, RefName};
/// use git_octopus::engine::commit::message;
///
/// let oid = Oid::new("a".repeat(40)).unwrap();
/// let branches = [
///     BranchRef::new(RefName::for_branch("one").unwrap(), oid.clone()),
///     BranchRef::new(RefName::for_branch("two").unwrap(), oid),
/// ];
/// let text = message(&branches);
/// assert!(text.starts_with("Merged branches:\nrefs/heads/one\nrefs/heads/two\n\n"));
/// ```
pub fn message(branches: &[BranchRef]) -> String {
    let mut text = String::from("Merged branches:\n");
    for branch in branches {
        text.push_str(branch.name.as_str());
        text.push('\n');
    }
    text.push_str(&format!("\nCommit created by {TOOL_NAME} {TOOL_VERSION}."));
    text
}

/// Write the commit object for `session`. No ref is moved.
///
/// The message lists the accepted branches only, one line per parent after
/// the first.
pub fn build<G: RepoGateway + ?Sized>(
    gateway: &G,
    session: &MergeSession,
    signature: &Signature,
) -> Result<MergeCommit, GitError> {
    let message = message(session.accepted());
    let oid = gateway.write_commit(session.tree(), session.parents(), &message, signature)?;
    info!(commit = %oid, parents = session.parents().len(), "wrote merge commit");

    Ok(MergeCommit {
        oid,
        tree: session.tree().clone(),
        parents: session.parents().to_vec(),
        message,
    })
}

/// A branch move to make visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish<'a> {
    /// Branch to move
    pub branch: &'a RefName,
    /// Commit the branch is expected to hold
    pub old_tip: &'a Oid,
    /// Tree of `old_tip`
    pub old_tree: &'a Oid,
    /// Commit to move the branch to
    pub new_tip: &'a Oid,
    /// Tree of `new_tip`
    pub new_tree: &'a Oid,
}

/// Check out the new tree and move the branch.
///
/// # Errors
///
/// - [`GitError::CheckoutFailed`] when local changes would be overwritten;
///   nothing has been changed
/// - [`GitError::CasFailed`] when the branch moved under us; the working
///   tree has been restored to the old tree
pub fn publish<G: RepoGateway + ?Sized>(gateway: &G, publish: &Publish<'_>) -> Result<(), GitError> {
    gateway.checkout_tree(publish.new_tree, false)?;

    let reflog = format!(
        "{TOOL_NAME}: {} -> {}",
        publish.old_tip.short(7),
        publish.new_tip.short(7)
    );
    if let Err(err) = gateway.update_ref(publish.branch, publish.old_tip, publish.new_tip, &reflog) {
        if let Err(restore) = gateway.checkout_tree(publish.old_tree, true) {
            warn!(error = %restore, "could not restore working tree");
        }
        return Err(err);
    }

    info!(branch = %publish.branch, to = %publish.new_tip, "branch updated");
    Ok(())
}
