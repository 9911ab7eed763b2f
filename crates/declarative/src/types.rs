//! Core types for declarative package states

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker used as `new` for a package that ends up installed.
pub const INSTALLED: &str = "installed";

/// Key under which an upgrade reports its change.
pub const UPGRADED_KEY: &str = "upgraded";

/// Before/after value of one changed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub old: String,
    pub new: String,
}

impl Change {
    /// A package going from absent to installed.
    pub fn installed() -> Self {
        Self {
            old: String::new(),
            new: INSTALLED.to_string(),
        }
    }

    /// A package going from installed to absent.
    pub fn removed() -> Self {
        Self {
            old: INSTALLED.to_string(),
            new: String::new(),
        }
    }

    /// The whole system moving to newer versions.
    pub fn upgraded() -> Self {
        Self {
            old: String::new(),
            new: "System packages upgraded".to_string(),
        }
    }
}

/// Uniform result of applying one declarative state.
///
/// With `dry_run` set, `changes` lists what a real run would do and nothing
/// was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResult {
    pub name: String,
    pub success: bool,
    pub dry_run: bool,
    pub changes: BTreeMap<String, Change>,
    pub comment: String,
}

impl StateResult {
    /// Successful result with no changes.
    pub fn ok(name: impl Into<String>, dry_run: bool, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            dry_run,
            changes: BTreeMap::new(),
            comment: comment.into(),
        }
    }

    /// Failed result with no changes.
    pub fn failed(name: impl Into<String>, dry_run: bool, comment: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(name, dry_run, comment)
        }
    }

    /// Add a change entry.
    pub fn with_change(mut self, key: impl Into<String>, change: Change) -> Self {
        self.changes.insert(key.into(), change);
        self
    }

    /// Whether the state changed (or would change) anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Changes that a real run would make.
    pub fn is_pending(&self) -> bool {
        self.dry_run && self.success && self.has_changes()
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub pending: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<StateResult>,
}

impl RunSummary {
    /// Build a summary from a list of results.
    pub fn from_results(results: impl IntoIterator<Item = StateResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of states processed
    pub fn total(&self) -> usize {
        self.changed + self.unchanged + self.pending + self.skipped + self.failed
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: StateResult) {
        if !result.success {
            self.failed += 1;
        } else if result.is_pending() {
            self.pending += 1;
        } else if result.has_changes() {
            self.changed += 1;
        } else {
            self.unchanged += 1;
        }
        self.results.push(result);
    }

    /// Record a state that was declined before it ran.
    pub fn add_skipped(&mut self, result: StateResult) {
        self.skipped += 1;
        self.results.push(result);
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: Self) {
        self.changed += other.changed;
        self.unchanged += other.unchanged;
        self.pending += other.pending;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.results.extend(other.results);
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_requires_dry_run_and_changes() {
        let preview = StateResult::ok("base", true, "Would install: git")
            .with_change("git", Change::installed());
        assert!(preview.is_pending());

        let applied = StateResult {
            dry_run: false,
            ..preview.clone()
        };
        assert!(!applied.is_pending());
        assert!(applied.has_changes());

        assert!(!StateResult::ok("base", true, "All 1 package(s) already installed").is_pending());
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_results([
            StateResult::ok("a", false, "Installed: git").with_change("git", Change::installed()),
            StateResult::ok("b", false, "All 2 package(s) already installed"),
            StateResult::failed("c", false, "yay cannot run as root"),
            StateResult::ok("d", true, "Would remove: vim").with_change("vim", Change::removed()),
        ]);

        assert_eq!(summary.changed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_merge() {
        let mut left = RunSummary::from_results([StateResult::ok("a", false, "")]);
        let mut right = RunSummary::default();
        right.add_skipped(StateResult::ok("b", false, "Skipped"));

        left.merge(right);
        assert_eq!(left.total(), 2);
        assert_eq!(left.skipped, 1);
        assert_eq!(left.results.len(), 2);
    }

    #[test]
    fn test_change_serializes_as_old_new() {
        let json = serde_json::to_value(Change::installed()).unwrap();
        assert_eq!(json, serde_json::json!({ "old": "", "new": "installed" }));
    }
}
