//! engine::resolve
//!
//! Expands branch patterns into the ordered set of merge candidates.
//!
//! # Invariants
//!
//! - Candidates are unique by full ref name
//! - Candidates are sorted lexically by full ref name
//! - The checked-out branch is never a candidate
//! - A non-empty pattern list that matches nothing is an error, not an empty set

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::pattern::RefPattern;
use crate::core::types::{BranchRef, RefName};
use crate::git::RepoGateway;

use super::runner::RunError;

/// Resolve `patterns` minus `excludes` into merge candidates.
///
/// # Errors
///
/// - [`RunError::NoPatterns`] when `patterns` is empty
/// - [`RunError::InvalidPattern`] when a pattern is not a valid glob
/// - [`RunError::NoMatchingBranches`] when nothing is left to merge
pub fn resolve<G: RepoGateway + ?Sized>(
    gateway: &G,
    patterns: &[String],
    excludes: &[String],
    current: &RefName,
) -> Result<Vec<BranchRef>, RunError> {
    if patterns.is_empty() {
        return Err(RunError::NoPatterns);
    }

    let includes = RefPattern::compile_all(patterns)?;
    let excludes = RefPattern::compile_all(excludes)?;

    let mut selected: BTreeMap<RefName, BranchRef> = BTreeMap::new();
    for pattern in &includes {
        for branch in gateway.list_refs_matching(pattern)? {
            if &branch.name == current {
                debug!(branch = %branch, "skipping checked-out branch");
                continue;
            }
            if let Some(exclude) = excludes.iter().find(|e| e.matches(&branch.name)) {
                debug!(branch = %branch, exclude = %exclude, "excluded by pattern");
                continue;
            }
            selected.entry(branch.name.clone()).or_insert(branch);
        }
    }

    if selected.is_empty() {
        return Err(RunError::NoMatchingBranches {
            patterns: patterns.to_vec(),
        });
    }

    Ok(selected.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::MockRepo;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (MockRepo, RefName) {
        let repo = MockRepo::new();
        let root = repo.head();
        for name in ["feature/b", "feature/a", "feature/a/nested", "fix/c", "wip"] {
            let tip = repo.commit(&root, &[(name, Some(name))], name);
            repo.set_branch(name, &tip);
        }
        (repo, RefName::for_branch("master").unwrap())
    }

    fn names(branches: &[BranchRef]) -> Vec<&str> {
        branches.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn sorted_and_deduplicated() {
        let (repo, master) = setup();
        let resolved = resolve(&repo, &strings(&["feature/*", "feature/a", "fix/*"]), &[], &master)
            .unwrap();

        assert_eq!(
            names(&resolved),
            [
                "refs/heads/feature/a",
                "refs/heads/feature/a/nested",
                "refs/heads/feature/b",
                "refs/heads/fix/c",
            ]
        );
    }

    #[test]
    fn current_branch_never_selected() {
        let (repo, master) = setup();
        let resolved = resolve(&repo, &strings(&["*"]), &[], &master).unwrap();
        assert!(resolved.iter().all(|b| b.name != master));
        assert_eq!(resolved.len(), 5);
    }

    #[test]
    fn excludes_applied() {
        let (repo, master) = setup();
        let resolved = resolve(
            &repo,
            &strings(&["*"]),
            &strings(&["feature/a*", "wip"]),
            &master,
        )
        .unwrap();
        assert_eq!(names(&resolved), ["refs/heads/feature/b", "refs/heads/fix/c"]);
    }

    #[test]
    fn remote_branches_matched_by_short_name() {
        let (repo, master) = setup();
        repo.set_branch("refs/remotes/origin/feature/z", &repo.head());

        let resolved = resolve(&repo, &strings(&["origin/*"]), &[], &master).unwrap();
        assert_eq!(names(&resolved), ["refs/remotes/origin/feature/z"]);
    }

    #[test]
    fn full_ref_pattern() {
        let (repo, master) = setup();
        let resolved = resolve(&repo, &strings(&["refs/heads/fix/*"]), &[], &master).unwrap();
        assert_eq!(names(&resolved), ["refs/heads/fix/c"]);
    }

    #[test]
    fn no_patterns() {
        let (repo, master) = setup();
        let result = resolve(&repo, &[], &[], &master);
        assert!(matches!(result, Err(RunError::NoPatterns)));
    }

    #[test]
    fn nothing_matches() {
        let (repo, master) = setup();
        let result = resolve(&repo, &strings(&["release/*"]), &[], &master);
        assert!(matches!(
            result,
            Err(RunError::NoMatchingBranches { patterns }) if patterns == ["release/*"]
        ));
    }

    #[test]
    fn only_current_branch_matches() {
        let (repo, master) = setup();
        let result = resolve(&repo, &strings(&["master"]), &[], &master);
        assert!(matches!(result, Err(RunError::NoMatchingBranches { .. })));
    }

    #[test]
    fn invalid_pattern() {
        let (repo, master) = setup();
        let result = resolve(&repo, &strings(&["feature/[a"]), &[], &master);
        assert!(matches!(
            result,
            Err(RunError::InvalidPattern { pattern, .. }) if pattern == "feature/[a"
        ));
    }
}
