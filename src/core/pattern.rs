//! core::pattern
//!
//! Shell-glob patterns for selecting branches.
//!
//! A pattern is matched against a ref's short name (`feature/login` for
//! `refs/heads/feature/login`, `origin/feature/login` for the remote-tracking
//! ref). Patterns that start with `refs/` are matched against the full ref
//! name instead, so `refs/heads/*` never picks up remote-tracking branches.
//!
//! Supported syntax is the usual shell set: `*`, `?`, `[abc]`, `[a-z]`,
//! `[!abc]`. `*` also matches `/`, so `feature/*` selects nested branches
//! such as `feature/ui/button`.
//!
//! # Example
//!
//! ```
//! use git_octopus::core::pattern::RefPattern;
//! use git_octopus::core::types::RefName;
//!
//! let pattern = RefPattern::new("branch*").unwrap();
//! assert!(pattern.matches(&RefName::new("refs/heads/branch1").unwrap()));
//! assert!(!pattern.matches(&RefName::new("refs/heads/main").unwrap()));
//! ```

use glob::{MatchOptions, Pattern, PatternError};
use thiserror::Error;

use super::types::RefName;

/// A pattern that failed to compile.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid pattern '{pattern}': {message}")]
pub struct PatternSyntaxError {
    /// The pattern as given
    pub pattern: String,
    /// What is wrong with it
    pub message: String,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled branch selection pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPattern {
    source: String,
    compiled: Pattern,
    full_ref: bool,
}

impl RefPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternSyntaxError`] for empty patterns and malformed
    /// character classes.
    pub fn new(pattern: &str) -> Result<Self, PatternSyntaxError> {
        if pattern.trim().is_empty() {
            return Err(PatternSyntaxError {
                pattern: pattern.to_string(),
                message: "pattern cannot be empty".to_string(),
            });
        }

        let compiled = Pattern::new(pattern).map_err(|e: PatternError| PatternSyntaxError {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            compiled,
            full_ref: pattern.starts_with("refs/"),
        })
    }

    /// Compile a list of patterns, failing on the first bad one.
    pub fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Self>, PatternSyntaxError> {
        patterns.iter().map(|p| Self::new(p.as_ref())).collect()
    }

    /// Check whether a ref is selected by this pattern.
    pub fn matches(&self, name: &RefName) -> bool {
        let subject = if self.full_ref {
            name.as_str()
        } else {
            name.short_name()
        };
        self.compiled.matches_with(subject, MATCH_OPTIONS)
    }

    /// The pattern as the user wrote it.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for RefPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refname(name: &str) -> RefName {
        RefName::new(name).unwrap()
    }

    #[test]
    fn star_matches_prefix() {
        let p = RefPattern::new("branch*").unwrap();
        assert!(p.matches(&refname("refs/heads/branch1")));
        assert!(p.matches(&refname("refs/heads/branch")));
        assert!(!p.matches(&refname("refs/heads/octopus")));
    }

    #[test]
    fn star_crosses_slashes() {
        let p = RefPattern::new("feature/*").unwrap();
        assert!(p.matches(&refname("refs/heads/feature/test")));
        assert!(p.matches(&refname("refs/heads/feature/ui/button")));
        assert!(!p.matches(&refname("refs/heads/features")));
    }

    #[test]
    fn question_mark_and_classes() {
        let p = RefPattern::new("rel-?.[0-9]").unwrap();
        assert!(p.matches(&refname("refs/heads/rel-1.2")));
        assert!(!p.matches(&refname("refs/heads/rel-10.2")));
        assert!(!p.matches(&refname("refs/heads/rel-1.x")));

        let negated = RefPattern::new("fix-[!a]").unwrap();
        assert!(negated.matches(&refname("refs/heads/fix-b")));
        assert!(!negated.matches(&refname("refs/heads/fix-a")));
    }

    #[test]
    fn remote_refs_match_on_remote_short_name() {
        let p = RefPattern::new("origin/feature/*").unwrap();
        assert!(p.matches(&refname("refs/remotes/origin/feature/x")));
        assert!(!p.matches(&refname("refs/heads/feature/x")));
    }

    #[test]
    fn full_ref_patterns_match_full_names() {
        let p = RefPattern::new("refs/heads/*").unwrap();
        assert!(p.matches(&refname("refs/heads/anything")));
        assert!(!p.matches(&refname("refs/remotes/origin/anything")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let p = RefPattern::new("Feature*").unwrap();
        assert!(!p.matches(&refname("refs/heads/feature1")));
    }

    #[test]
    fn invalid_patterns_rejected() {
        assert!(RefPattern::new("").is_err());
        assert!(RefPattern::new("   ").is_err());
        let err = RefPattern::new("feature/[").unwrap_err();
        assert_eq!(err.pattern, "feature/[");
    }

    #[test]
    fn compile_all_stops_on_bad_pattern() {
        assert_eq!(RefPattern::compile_all(&["a*", "b*"]).unwrap().len(), 2);
        assert!(RefPattern::compile_all(&["a*", "["]).is_err());
    }
}
