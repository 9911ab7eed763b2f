//! Execution planner - groups package states by execution context

use crate::state::PackageState;

/// An execution plan with states grouped by execution context
///
/// Privileged states (pacman, run as root) execute before user-scoped
/// ones (yay), so repository packages an AUR build depends on are present
/// first.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// States run as root
    pub privileged: Vec<PackageState>,
    /// States run in a user's context
    pub user_scoped: Vec<PackageState>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state, classifying by its backend
    pub fn add_state(&mut self, state: PackageState) {
        if state.is_user_scoped() {
            self.user_scoped.push(state);
        } else {
            self.privileged.push(state);
        }
    }

    /// Filter plan to only include states matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PackageState) -> bool,
    {
        Self {
            privileged: self.privileged.into_iter().filter(|s| predicate(s)).collect(),
            user_scoped: self.user_scoped.into_iter().filter(|s| predicate(s)).collect(),
        }
    }

    /// Filter plan to only include states matching a target pattern
    ///
    /// Target format: "name", "backend" or "backend.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (backend, name) = parse_target(t);
                self.filter(|s| matches_filter(s, backend.as_deref(), &name))
            }
        }
    }

    /// States in execution order
    pub fn iter(&self) -> impl Iterator<Item = &PackageState> {
        self.privileged.iter().chain(&self.user_scoped)
    }

    /// Total number of states in the plan
    pub fn total_states(&self) -> usize {
        self.privileged.len() + self.user_scoped.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.privileged.is_empty() && self.user_scoped.is_empty()
    }
}

impl FromIterator<PackageState> for ExecutionPlan {
    fn from_iter<I: IntoIterator<Item = PackageState>>(iter: I) -> Self {
        let mut plan = Self::new();
        for state in iter {
            plan.add_state(state);
        }
        plan
    }
}

/// Parse a target string like "backend.name" into (backend, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        Some((backend, name)) => (Some(backend.to_string()), Some(name.to_string())),
        None => (None, Some(target.to_string())),
    }
}

/// Check if a state matches the filter criteria
///
/// A bare target matches either a state name or a backend name.
fn matches_filter(state: &PackageState, backend: Option<&str>, name: &Option<String>) -> bool {
    let backend_matches = |b: &str| {
        pkgkit::BackendKind::from_name(b).is_some_and(|kind| kind == state.backend)
    };

    match (backend, name.as_deref()) {
        (Some(b), Some(n)) => backend_matches(b) && state.name == n,
        (None, Some(n)) => state.name == n || backend_matches(n),
        _ => true,
    }
}
