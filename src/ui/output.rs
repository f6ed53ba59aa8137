//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, the run result is printed as JSON on stdout and
//! nothing else is written there.

use std::fmt::Display;

use serde::Serialize;

use crate::engine::{RunOutcome, RunResult};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print a value as pretty JSON on stdout.
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary of a run.
pub fn summary(result: &RunResult) -> String {
    let branch = result.branch.short_name();
    match &result.outcome {
        RunOutcome::UpToDate => "Already up to date.".to_string(),
        RunOutcome::FastForwarded { to } => {
            format!("Fast-forwarded {} to {}.", branch, to.short(7))
        }
        RunOutcome::Merged { commit } => format!(
            "Merged {} branch{} into {} ({}).",
            result.merged.len(),
            if result.merged.len() == 1 { "" } else { "es" },
            branch,
            commit.short(7)
        ),
        RunOutcome::DryRun { tree } => format!(
            "Would merge {} branch{} into {} (tree {}); nothing written.",
            result.merged.len(),
            if result.merged.len() == 1 { "" } else { "es" },
            branch,
            tree.short(7)
        ),
    }
}

/// Print the human-readable report of a run: merged refs, one warning per
/// excluded branch, then the summary line.
pub fn report(result: &RunResult, verbosity: Verbosity) {
    if !result.merged.is_empty() {
        let names: Vec<_> = result.merged.iter().map(|b| b.name.as_str()).collect();
        print(format_list(&names, "  "), verbosity);
    }

    for branch in &result.contained {
        debug(format!("already contained {}", branch.name), verbosity);
    }

    for rejection in &result.excluded {
        warn(format!("excluded {}", rejection), verbosity);
    }

    for commit in &result.commits {
        debug(
            format!(
                "commit {} ({} parents)",
                commit.oid.short(7),
                commit.parents.len()
            ),
            verbosity,
        );
    }

    print(summary(result), verbosity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchRef, Oid, RefName};
    use crate::engine::{RejectReason, Rejection};

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn result(outcome: RunOutcome, merged: usize) -> RunResult {
        RunResult {
            outcome,
            branch: BranchRef::new(RefName::for_branch("master").unwrap(), oid('a')),
            merged: (0..merged)
                .map(|i| BranchRef::new(RefName::for_branch(&format!("b{i}")).unwrap(), oid('b')))
                .collect(),
            contained: vec![],
            excluded: vec![],
            commits: vec![],
        }
    }

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn summaries() {
        assert_eq!(
            summary(&result(RunOutcome::UpToDate, 0)),
            "Already up to date."
        );
        assert_eq!(
            summary(&result(RunOutcome::FastForwarded { to: oid('c') }, 1)),
            "Fast-forwarded master to ccccccc."
        );
        assert_eq!(
            summary(&result(RunOutcome::Merged { commit: oid('d') }, 3)),
            "Merged 3 branches into master (ddddddd)."
        );
        assert_eq!(
            summary(&result(RunOutcome::DryRun { tree: oid('e') }, 1)),
            "Would merge 1 branch into master (tree eeeeeee); nothing written."
        );
    }

    #[test]
    fn result_json_shape() {
        let mut run = result(RunOutcome::Merged { commit: oid('d') }, 1);
        run.excluded.push(Rejection {
            branch: BranchRef::new(RefName::for_branch("bad").unwrap(), oid('f')),
            reason: RejectReason::Conflict {
                paths: vec!["readme".to_string()],
            },
        });

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["outcome"]["kind"], "merged");
        assert_eq!(value["outcome"]["commit"], oid('d').as_str());
        assert_eq!(value["merged"][0]["name"], "refs/heads/b0");
        assert_eq!(value["contained"], serde_json::json!([]));
        assert_eq!(value["excluded"][0]["reason"], "conflict");
        assert_eq!(value["excluded"][0]["paths"][0], "readme");
    }

    #[test]
    fn format_list_prefixes() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }
}
