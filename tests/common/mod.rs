//! Shared test helpers for git-octopus integration tests.
//!
//! All tests use temp directories; nothing touches the real repository.
//! Repositories are built with the `git` binary so the code under test is
//! checked against what git itself produces.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use git_octopus::git::Git;

/// A real git repository in a temp directory, on `master`, with one commit.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository with an initial commit on `master`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Self { dir };

        repo.git_cmd(&["init", "-q"]);
        repo.git_cmd(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        repo.git_cmd(&["config", "user.email", "test@example.com"]);
        repo.git_cmd(&["config", "user.name", "Test User"]);
        repo.git_cmd(&["config", "commit.gpgsign", "false"]);

        repo.commit_file("README.md", "# Test Repo\n", "Initial commit");
        repo
    }

    /// Path of the working directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open the repository through the library.
    pub fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    /// Run a git command, panicking on failure, and return trimmed stdout.
    pub fn git_cmd(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("failed to run git");

        if !output.status.success() {
            panic!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Run a git command and report whether it succeeded.
    pub fn git_ok(&self, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("failed to run git")
            .status
            .success()
    }

    /// Write a file in the working tree.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// Write, stage and commit a file. Returns the new commit id.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        self.write(path, content);
        self.git_cmd(&["add", path]);
        self.git_cmd(&["commit", "-q", "-m", message]);
        self.rev_parse("HEAD")
    }

    /// Create `name` from `start` and check it out.
    pub fn branch_from(&self, name: &str, start: &str) {
        self.git_cmd(&["checkout", "-q", "-b", name, start]);
    }

    /// Check out an existing branch.
    pub fn checkout(&self, name: &str) {
        self.git_cmd(&["checkout", "-q", name]);
    }

    /// Commit id of a revision.
    pub fn rev_parse(&self, rev: &str) -> String {
        self.git_cmd(&["rev-parse", rev])
    }

    /// `git status --porcelain`; empty means clean.
    pub fn status(&self) -> String {
        self.git_cmd(&["status", "--porcelain"])
    }

    /// Check if `ancestor` is an ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.git_ok(&["merge-base", "--is-ancestor", ancestor, descendant])
    }

    /// Parent ids of a commit, in order.
    pub fn parents(&self, rev: &str) -> Vec<String> {
        self.git_cmd(&["rev-list", "--parents", "-n", "1", rev])
            .split_whitespace()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    /// Full message of a commit.
    pub fn message(&self, rev: &str) -> String {
        self.git_cmd(&["show", "-s", "--pretty=format:%B", rev])
    }

    /// Branches `branch1`, `branch2`, `branch3` off master, each adding its
    /// own file `foo1`, `foo2`, `foo3`. Leaves `master` checked out.
    pub fn with_three_siblings(self) -> Self {
        for i in 1..=3 {
            self.branch_from(&format!("branch{i}"), "master");
            self.commit_file(&format!("foo{i}"), "First line", &format!("add foo{i}"));
        }
        self.checkout("master");
        self
    }
}
