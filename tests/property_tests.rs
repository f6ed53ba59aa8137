//! Property-based tests for the merge engine and branch patterns.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated branch layouts, run against the in-memory repository.

use proptest::prelude::*;

use git_octopus::core::pattern::RefPattern;
use git_octopus::core::types::{Oid, RefName};
use git_octopus::engine::{run, RunError, RunOptions, RunOutcome, RunResult};
use git_octopus::git::mock::MockRepo;
use git_octopus::git::RepoGateway;

/// A topic branch either adds its own file or rewrites `shared`, which master
/// also rewrote, and therefore conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Disjoint,
    Conflicting,
}

fn topics() -> impl Strategy<Value = Vec<Topic>> {
    prop::collection::vec(
        prop_oneof![3 => Just(Topic::Disjoint), 1 => Just(Topic::Conflicting)],
        1..7,
    )
}

struct Layout {
    repo: MockRepo,
    master: Oid,
    tips: Vec<Oid>,
}

/// Master and every `topic/<i>` fork from a common base commit.
fn layout(topics: &[Topic]) -> Layout {
    let repo = MockRepo::new();
    let base = repo.commit(&repo.head(), &[("shared", Some("base"))], "base");
    let master = repo.commit(&base, &[("shared", Some("master"))], "master");
    repo.set_branch("master", &master);
    repo.checkout("master");

    let tips = topics
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            let file = format!("file{i}");
            let content = format!("topic {i}");
            let change = match topic {
                Topic::Disjoint => (file.as_str(), Some(content.as_str())),
                Topic::Conflicting => ("shared", Some(content.as_str())),
            };
            let tip = repo.commit(&base, &[change], &format!("topic {i}"));
            repo.set_branch(&format!("topic/{i}"), &tip);
            tip
        })
        .collect();

    Layout { repo, master, tips }
}

fn options(chunk_size: Option<usize>) -> RunOptions {
    RunOptions {
        patterns: vec!["topic/*".to_string()],
        chunk_size,
        ..RunOptions::default()
    }
}

fn indices(topics: &[Topic], kind: Topic) -> Vec<usize> {
    (0..topics.len()).filter(|&i| topics[i] == kind).collect()
}

fn short_names(result: &RunResult) -> (Vec<String>, Vec<String>) {
    (
        result.merged.iter().map(|b| b.short_name().to_string()).collect(),
        result
            .excluded
            .iter()
            .map(|r| r.branch.short_name().to_string())
            .collect(),
    )
}

fn names(indices: &[usize]) -> Vec<String> {
    indices.iter().map(|i| format!("topic/{i}")).collect()
}

/// Simple branch name segment.
fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Exactly the conflicting branches are left out; everything else lands in
    /// one commit whose parents are the old tip followed by the merged branches.
    #[test]
    fn conflicting_branches_excluded(topics in topics()) {
        prop_assume!(topics.contains(&Topic::Disjoint));
        let layout = layout(&topics);
        let disjoint = indices(&topics, Topic::Disjoint);

        let result = run(&layout.repo, &options(None)).unwrap();

        let (merged, excluded) = short_names(&result);
        prop_assert_eq!(merged, names(&disjoint));
        prop_assert_eq!(excluded, names(&indices(&topics, Topic::Conflicting)));

        let RunOutcome::Merged { commit } = &result.outcome else {
            panic!("expected a merge commit, got {:?}", result.outcome);
        };
        let master_tip = layout.repo.branch("master");
        prop_assert_eq!(master_tip.as_ref(), Some(commit));

        let mut expected_parents = vec![layout.master.clone()];
        expected_parents.extend(disjoint.iter().map(|&i| layout.tips[i].clone()));
        let written = layout.repo.commit_object(commit).unwrap();
        prop_assert_eq!(&written.parents, &expected_parents);

        let files = layout.repo.commit_files(commit);
        prop_assert_eq!(files.get("shared").map(String::as_str), Some("master"));
        for i in disjoint {
            let file = format!("file{i}");
            prop_assert!(files.contains_key(&file), "missing {}", file);
        }
        prop_assert_eq!(layout.repo.worktree_tree(), written.tree);
    }

    /// Two identical repositories give identical results.
    #[test]
    fn runs_are_deterministic(topics in topics()) {
        let first = run(&layout(&topics).repo, &options(None));
        let second = run(&layout(&topics).repo, &options(None));

        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a.outcome, &b.outcome);
                prop_assert_eq!(short_names(&a), short_names(&b));
            }
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("runs disagree: {:?} vs {:?}", a, b),
        }
    }

    /// A chunk at least as large as the candidate list changes nothing.
    #[test]
    fn large_chunk_equals_single_pass(topics in topics(), extra in 0usize..3) {
        prop_assume!(topics.contains(&Topic::Disjoint));
        let single = run(&layout(&topics).repo, &options(None)).unwrap();
        let chunked = run(&layout(&topics).repo, &options(Some(topics.len() + extra))).unwrap();

        prop_assert_eq!(&single.outcome, &chunked.outcome);
        prop_assert_eq!(single.commits.len(), 1);
        prop_assert_eq!(chunked.commits.len(), 1);
    }

    /// Any chunk size ends with the same files and every merged branch
    /// reachable from the new tip.
    #[test]
    fn chunking_preserves_content(topics in topics(), chunk in 1usize..4) {
        prop_assume!(topics.contains(&Topic::Disjoint));
        let single = layout(&topics);
        run(&single.repo, &options(None)).unwrap();

        let chunked = layout(&topics);
        let result = run(&chunked.repo, &options(Some(chunk))).unwrap();

        let tip = chunked.repo.branch("master").unwrap();
        let single_tip = single.repo.branch("master").unwrap();
        prop_assert_eq!(chunked.repo.commit_files(&tip), single.repo.commit_files(&single_tip));
        for branch in &result.merged {
            prop_assert!(chunked.repo.is_ancestor(&branch.oid, &tip).unwrap());
        }
        prop_assert!(chunked.repo.is_ancestor(&chunked.master, &tip).unwrap());
        prop_assert_eq!(chunked.repo.ref_update_count(), 1);
    }

    /// When every branch conflicts the run fails and master stays put.
    #[test]
    fn all_conflicting_leaves_master(count in 1usize..5) {
        let topics = vec![Topic::Conflicting; count];
        let layout = layout(&topics);
        let worktree = layout.repo.worktree_tree();

        let result = run(&layout.repo, &options(None));

        match result {
            Err(RunError::NoBranchMerged { rejected }) => prop_assert_eq!(rejected.len(), count),
            other => panic!("expected NoBranchMerged, got {:?}", other),
        }
        prop_assert_eq!(layout.repo.branch("master"), Some(layout.master.clone()));
        prop_assert_eq!(layout.repo.worktree_tree(), worktree);
        prop_assert_eq!(layout.repo.ref_update_count(), 0);
    }

    /// Running again after a merge is a no-op.
    #[test]
    fn second_run_is_up_to_date(topics in topics()) {
        prop_assume!(topics.contains(&Topic::Disjoint));
        let layout = layout(&topics);
        run(&layout.repo, &options(None)).unwrap();
        let tip = layout.repo.branch("master");

        let again = run(&layout.repo, &options(None)).unwrap();

        prop_assert_eq!(&again.outcome, &RunOutcome::UpToDate);
        prop_assert_eq!(layout.repo.branch("master"), tip);
    }

    /// A branch name used as a pattern selects that branch.
    #[test]
    fn literal_pattern_matches_itself(parts in prop::collection::vec(segment(), 1..4)) {
        let name = parts.join("/");
        let pattern = RefPattern::new(&name).unwrap();

        prop_assert!(pattern.matches(&RefName::for_branch(&name).unwrap()));
        // remote-tracking short names carry the remote
        let remote = RefName::new(format!("refs/remotes/origin/{name}")).unwrap();
        prop_assert!(!pattern.matches(&remote));
    }

    /// `prefix*` selects every branch below the prefix, however deep.
    #[test]
    fn star_matches_nested_names(prefix in segment(), rest in prop::collection::vec(segment(), 1..4)) {
        let pattern = RefPattern::new(&format!("{prefix}/*")).unwrap();
        let name = format!("{prefix}/{}", rest.join("/"));

        prop_assert!(pattern.matches(&RefName::for_branch(&name).unwrap()));
        prop_assert!(!pattern.matches(&RefName::for_branch(&rest.join("/")).unwrap()) || rest[0] == prefix);
    }

    /// Full-ref patterns never cross from local to remote-tracking refs.
    #[test]
    fn full_ref_pattern_scoped(name in segment()) {
        let local = RefPattern::new("refs/heads/*").unwrap();
        let remote = RefName::new(format!("refs/remotes/origin/{name}")).unwrap();

        prop_assert!(local.matches(&RefName::for_branch(&name).unwrap()));
        prop_assert!(!local.matches(&remote));
    }
}
