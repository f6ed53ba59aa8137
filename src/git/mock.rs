//! git::mock
//!
//! In-memory repository for deterministic testing.
//!
//! # Design
//!
//! `MockRepo` implements [`RepoGateway`] over a tiny content-addressed object
//! store: trees are flat maps from path to file content, commits point at a
//! tree and a list of parents, and refs map names to commits. Object ids are
//! SHA-256 digests of the object content, so identical trees always get
//! identical ids.
//!
//! Tree merges are resolved path by path: a side that left a path unchanged
//! from the base yields to the side that changed it, identical changes
//! agree, and anything else is a conflict.
//!
//! Failures can be injected to exercise the engine's error paths.
//!
//! # Example
//!
//! ```
//! use git_octopus::git::mock::MockRepo;
//! use git_octopus::git::RepoGateway;
//!
//! let repo = MockRepo::new();
//! let root = repo.head();
//! let tip = repo.commit(&root, &[("foo", Some("hello"))], "add foo");
//! repo.set_branch("feature", &tip);
//!
//! assert!(repo.is_ancestor(&root, &tip).unwrap());
//! assert_eq!(repo.list_branch_refs().unwrap().len(), 2);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::core::types::{BranchRef, Oid, RefName};

use super::gateway::{RepoGateway, Signature, TreeMerge};
use super::{GitError, GitState};

type Files = BTreeMap<String, String>;

/// A commit stored by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    /// Tree the commit points at
    pub tree: Oid,
    /// Parents, in order
    pub parents: Vec<Oid>,
    /// Commit message
    pub message: String,
    /// Author identity
    pub author: Signature,
}

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailPoint {
    /// `merge_trees` returns an internal error.
    MergeTrees,
    /// `write_commit` returns an internal error.
    WriteCommit,
    /// `update_ref` returns an access error.
    UpdateRef,
    /// `checkout_tree` without force returns a checkout error.
    Checkout,
}

/// Mock repository for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRepo {
    inner: Arc<Mutex<MockRepoInner>>,
}

#[derive(Debug)]
struct MockRepoInner {
    trees: HashMap<Oid, Files>,
    commits: HashMap<Oid, MockCommit>,
    refs: BTreeMap<RefName, Oid>,
    /// `None` means HEAD is detached.
    head: Option<RefName>,
    detached_at: Option<Oid>,
    /// Tree currently checked out in the working tree.
    worktree: Oid,
    dirty: bool,
    state: GitState,
    identity: Option<Signature>,
    failures: BTreeSet<FailPoint>,
    ref_updates: usize,
}

fn digest(kind: &str, body: &str) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(body.as_bytes());
    // SHA-256 hex is always a valid 64-character object id
    Oid::new(hex::encode(hasher.finalize())).unwrap_or_else(|_| unreachable!())
}

fn tree_id(files: &Files) -> Oid {
    let body = files
        .iter()
        .map(|(path, content)| format!("{path}\0{content}\n"))
        .collect::<String>();
    digest("tree", &body)
}

fn commit_id(commit: &MockCommit) -> Oid {
    let parents = commit
        .parents
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",");
    digest(
        "commit",
        &format!(
            "{}\n{}\n{} <{}>\n{}",
            commit.tree, parents, commit.author.name, commit.author.email, commit.message
        ),
    )
}

impl MockRepoInner {
    fn insert_tree(&mut self, files: Files) -> Oid {
        let id = tree_id(&files);
        self.trees.entry(id.clone()).or_insert(files);
        id
    }

    fn insert_commit(&mut self, commit: MockCommit) -> Oid {
        let id = commit_id(&commit);
        self.commits.entry(id.clone()).or_insert(commit);
        id
    }

    fn commit(&self, oid: &Oid) -> Result<&MockCommit, GitError> {
        self.commits.get(oid).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    fn tree(&self, oid: &Oid) -> Result<&Files, GitError> {
        self.trees.get(oid).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    /// Every commit reachable from `tip`, including `tip`.
    fn ancestors(&self, tip: &Oid) -> Result<BTreeSet<Oid>, GitError> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([tip.clone()]);
        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid.clone()) {
                continue;
            }
            queue.extend(self.commit(&oid)?.parents.iter().cloned());
        }
        Ok(seen)
    }

    /// Best common ancestor of `commit` and the union of `others`' histories.
    fn best_common_ancestor(&self, commit: &Oid, others: &[Oid]) -> Result<Option<Oid>, GitError> {
        let mine = self.ancestors(commit)?;
        let mut theirs = BTreeSet::new();
        for other in others {
            theirs.extend(self.ancestors(other)?);
        }

        let common: Vec<Oid> = mine.intersection(&theirs).cloned().collect();
        let mut best = Vec::new();
        for candidate in &common {
            let mut dominated = false;
            for other in &common {
                if other != candidate && self.ancestors(other)?.contains(candidate) {
                    dominated = true;
                    break;
                }
            }
            if !dominated {
                best.push(candidate.clone());
            }
        }

        // Several equally good bases: pick one deterministically
        Ok(best.into_iter().min())
    }

    fn check(&self, point: FailPoint) -> Result<(), GitError> {
        if self.failures.contains(&point) {
            return Err(match point {
                FailPoint::MergeTrees | FailPoint::WriteCommit => GitError::Internal {
                    message: format!("injected failure: {:?}", point),
                },
                FailPoint::UpdateRef => GitError::AccessError {
                    message: "injected failure: ref is locked".to_string(),
                },
                FailPoint::Checkout => GitError::CheckoutFailed {
                    message: "injected failure: local changes would be overwritten".to_string(),
                },
            });
        }
        Ok(())
    }
}

impl Default for MockRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepo {
    /// Create a repository with one empty root commit on `master`, checked out.
    pub fn new() -> Self {
        let identity = Signature::new("Test User", "test@example.com");
        let mut inner = MockRepoInner {
            trees: HashMap::new(),
            commits: HashMap::new(),
            refs: BTreeMap::new(),
            head: None,
            detached_at: None,
            worktree: tree_id(&Files::new()),
            dirty: false,
            state: GitState::Clean,
            identity: Some(identity.clone()),
            failures: BTreeSet::new(),
            ref_updates: 0,
        };

        let tree = inner.insert_tree(Files::new());
        let root = inner.insert_commit(MockCommit {
            tree: tree.clone(),
            parents: Vec::new(),
            message: "initial commit".to_string(),
            author: identity,
        });
        let master = RefName::for_branch("master").unwrap_or_else(|_| unreachable!());
        inner.refs.insert(master.clone(), root);
        inner.head = Some(master);
        inner.worktree = tree;

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockRepoInner> {
        // A panicking test thread must not hide the state from the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn branch_ref(name: &str) -> RefName {
        if name.starts_with("refs/") {
            RefName::new(name).expect("valid ref name in test setup")
        } else {
            RefName::for_branch(name).expect("valid branch name in test setup")
        }
    }

    // =========================================================================
    // Test setup
    // =========================================================================

    /// Create a commit on top of `parent` applying `changes`.
    ///
    /// Each change is `(path, Some(content))` to write or `(path, None)` to
    /// delete. No ref is moved.
    pub fn commit(&self, parent: &Oid, changes: &[(&str, Option<&str>)], message: &str) -> Oid {
        self.commit_with_parents(&[parent.clone()], changes, message)
    }

    /// Create a commit with explicit parents; the tree starts from the first parent.
    pub fn commit_with_parents(
        &self,
        parents: &[Oid],
        changes: &[(&str, Option<&str>)],
        message: &str,
    ) -> Oid {
        let mut inner = self.lock();
        let mut files = match parents.first() {
            Some(first) => {
                let tree = inner.commit(first).expect("parent exists").tree.clone();
                inner.tree(&tree).expect("tree exists").clone()
            }
            None => Files::new(),
        };
        for (path, content) in changes {
            match content {
                Some(content) => {
                    files.insert(path.to_string(), content.to_string());
                }
                None => {
                    files.remove(*path);
                }
            }
        }
        let tree = inner.insert_tree(files);
        let author = Signature::new("Test User", "test@example.com");
        inner.insert_commit(MockCommit {
            tree,
            parents: parents.to_vec(),
            message: message.to_string(),
            author,
        })
    }

    /// Point a branch (short name or full ref) at a commit, creating it if needed.
    pub fn set_branch(&self, name: &str, oid: &Oid) {
        self.lock().refs.insert(Self::branch_ref(name), oid.clone());
    }

    /// Remove a branch.
    pub fn delete_branch(&self, name: &str) {
        self.lock().refs.remove(&Self::branch_ref(name));
    }

    /// Commit a branch points at.
    pub fn branch(&self, name: &str) -> Option<Oid> {
        self.lock().refs.get(&Self::branch_ref(name)).cloned()
    }

    /// Check out a branch: HEAD follows it and the working tree matches it.
    pub fn checkout(&self, name: &str) {
        let refname = Self::branch_ref(name);
        let mut inner = self.lock();
        let tip = inner.refs.get(&refname).cloned().expect("branch exists");
        inner.worktree = inner.commit(&tip).expect("commit exists").tree.clone();
        inner.head = Some(refname);
        inner.detached_at = None;
    }

    /// Detach HEAD at its current commit.
    pub fn detach_head(&self) {
        let head = self.head();
        let mut inner = self.lock();
        inner.head = None;
        inner.detached_at = Some(head);
    }

    /// Commit HEAD points at.
    pub fn head(&self) -> Oid {
        let inner = self.lock();
        match &inner.head {
            Some(name) => inner.refs.get(name).cloned().expect("HEAD branch exists"),
            None => inner.detached_at.clone().expect("detached HEAD has a commit"),
        }
    }

    /// Mark the working tree dirty (or clean).
    pub fn set_dirty(&self, dirty: bool) {
        self.lock().dirty = dirty;
    }

    /// Simulate an in-progress operation.
    pub fn set_state(&self, state: GitState) {
        self.lock().state = state;
    }

    /// Remove the configured identity.
    pub fn clear_identity(&self) {
        self.lock().identity = None;
    }

    /// Make an operation fail until [`MockRepo::clear_failures`] is called.
    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Stored commit.
    pub fn commit_object(&self, oid: &Oid) -> Option<MockCommit> {
        self.lock().commits.get(oid).cloned()
    }

    /// Files of a tree.
    pub fn tree_files(&self, tree: &Oid) -> BTreeMap<String, String> {
        self.lock().trees.get(tree).cloned().unwrap_or_default()
    }

    /// Files of a commit's tree.
    pub fn commit_files(&self, commit: &Oid) -> BTreeMap<String, String> {
        let tree = self.lock().commits.get(commit).map(|c| c.tree.clone());
        tree.map(|t| self.tree_files(&t)).unwrap_or_default()
    }

    /// Tree currently checked out.
    pub fn worktree_tree(&self) -> Oid {
        self.lock().worktree.clone()
    }

    /// Number of successful ref updates so far.
    pub fn ref_update_count(&self) -> usize {
        self.lock().ref_updates
    }

    /// Number of commit objects stored.
    pub fn commit_count(&self) -> usize {
        self.lock().commits.len()
    }
}

impl RepoGateway for MockRepo {
    fn state(&self) -> GitState {
        self.lock().state.clone()
    }

    fn list_branch_refs(&self) -> Result<Vec<BranchRef>, GitError> {
        Ok(self
            .lock()
            .refs
            .iter()
            .filter(|(name, _)| name.is_branch_ref() || name.is_remote_ref())
            .map(|(name, oid)| BranchRef::new(name.clone(), oid.clone()))
            .collect())
    }

    fn current_branch(&self) -> Result<BranchRef, GitError> {
        let inner = self.lock();
        let name = inner.head.clone().ok_or(GitError::DetachedHead)?;
        let oid = inner
            .refs
            .get(&name)
            .cloned()
            .ok_or_else(|| GitError::RefNotFound {
                refname: name.to_string(),
            })?;
        Ok(BranchRef::new(name, oid))
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        Ok(self.lock().ancestors(descendant)?.contains(ancestor))
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        self.lock().best_common_ancestor(a, std::slice::from_ref(b))
    }

    fn merge_base_many(&self, commit: &Oid, others: &[Oid]) -> Result<Option<Oid>, GitError> {
        self.lock().best_common_ancestor(commit, others)
    }

    fn commit_tree(&self, commit: &Oid) -> Result<Oid, GitError> {
        Ok(self.lock().commit(commit)?.tree.clone())
    }

    fn merge_trees(&self, base: &Oid, ours: &Oid, theirs: &Oid) -> Result<TreeMerge, GitError> {
        let mut inner = self.lock();
        inner.check(FailPoint::MergeTrees)?;

        let base_files = inner.tree(base)?.clone();
        let our_files = inner.tree(ours)?.clone();
        let their_files = inner.tree(theirs)?.clone();

        let paths: BTreeSet<&String> = base_files
            .keys()
            .chain(our_files.keys())
            .chain(their_files.keys())
            .collect();

        let mut merged = Files::new();
        let mut conflicts = Vec::new();
        for path in paths {
            let b = base_files.get(path);
            let o = our_files.get(path);
            let t = their_files.get(path);

            let resolved = if o == t || t == b {
                o
            } else if o == b {
                t
            } else {
                conflicts.push(path.clone());
                continue;
            };

            if let Some(content) = resolved {
                merged.insert(path.clone(), content.clone());
            }
        }

        if !conflicts.is_empty() {
            return Ok(TreeMerge::Conflicted(conflicts));
        }
        Ok(TreeMerge::Clean(inner.insert_tree(merged)))
    }

    fn signature(&self) -> Result<Signature, GitError> {
        self.lock()
            .identity
            .clone()
            .ok_or_else(|| GitError::MissingIdentity {
                message: "user.name is not set".to_string(),
            })
    }

    fn write_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid, GitError> {
        let mut inner = self.lock();
        inner.check(FailPoint::WriteCommit)?;
        inner.tree(tree)?;
        for parent in parents {
            inner.commit(parent)?;
        }
        Ok(inner.insert_commit(MockCommit {
            tree: tree.clone(),
            parents: parents.to_vec(),
            message: message.to_string(),
            author: author.clone(),
        }))
    }

    fn update_ref(
        &self,
        refname: &RefName,
        from: &Oid,
        to: &Oid,
        _reflog_message: &str,
    ) -> Result<(), GitError> {
        let mut inner = self.lock();
        inner.check(FailPoint::UpdateRef)?;

        match inner.refs.get(refname) {
            Some(actual) if actual == from => {}
            other => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: from.to_string(),
                    actual: other
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "<none>".to_string()),
                })
            }
        }

        inner.commit(to)?;
        inner.refs.insert(refname.clone(), to.clone());
        inner.ref_updates += 1;
        Ok(())
    }

    fn checkout_tree(&self, tree: &Oid, force: bool) -> Result<(), GitError> {
        let mut inner = self.lock();
        if !force {
            inner.check(FailPoint::Checkout)?;
            if inner.dirty {
                return Err(GitError::CheckoutFailed {
                    message: "local changes would be overwritten".to_string(),
                });
            }
        }
        inner.tree(tree)?;
        inner.worktree = tree.clone();
        inner.dirty = false;
        Ok(())
    }

    fn is_worktree_clean(&self) -> Result<bool, GitError> {
        Ok(!self.lock().dirty)
    }
}
