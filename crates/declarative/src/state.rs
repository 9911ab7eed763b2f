//! The declarative states: `installed`, `removed` and `uptodate`.
//!
//! Each state wraps one pkgkit operation and folds its outcome into a
//! [`StateResult`]. Precondition and availability errors become a failed
//! result carrying the error message; they never escape as `Err`.

use crate::types::{Change, StateResult, UPGRADED_KEY};
use log::{debug, warn};
use pkgkit::{
    Backend, BackendKind, DryRunReport, Reconciliation, ReconciliationOutcome, RemoveOutcome,
    UpgradeOutcome, reconcile,
};
use serde::{Deserialize, Serialize};

/// Ensure every package in `names` is installed.
///
/// `name` labels the result (a set name or state id).
pub fn installed(
    name: &str,
    backend: &dyn Backend,
    names: &[String],
    identity: Option<&str>,
    refresh: bool,
    dry_run: bool,
) -> StateResult {
    if let Err(e) = backend.check_identity(identity) {
        return StateResult::failed(name, dry_run, e.to_string());
    }
    if names.is_empty() {
        return StateResult::ok(name, dry_run, "No packages specified");
    }

    match reconcile::reconcile(names, backend, identity, refresh, dry_run) {
        Ok(Reconciliation::Plan(report)) => preview_install(name, &report),
        Ok(Reconciliation::Applied(outcome)) => applied_install(name, &outcome, dry_run),
        Err(e) => {
            warn!("{}: {e}", backend.name());
            StateResult::failed(name, dry_run, e.to_string())
        }
    }
}

fn preview_install(name: &str, report: &DryRunReport) -> StateResult {
    let mut comment = format!("Would install: {}", report.would_install.join(", "));
    if !report.already_installed.is_empty() {
        comment.push_str(&format!(
            ". Already installed: {}",
            report.already_installed.join(", ")
        ));
    }

    report
        .would_install
        .iter()
        .fold(StateResult::ok(name, true, comment), |result, pkg| {
            result.with_change(pkg, Change::installed())
        })
}

fn applied_install(name: &str, outcome: &ReconciliationOutcome, dry_run: bool) -> StateResult {
    if !outcome.has_changes() && outcome.failed.is_empty() {
        return StateResult::ok(
            name,
            dry_run,
            format!(
                "All {} package(s) already installed",
                outcome.already_installed.len()
            ),
        );
    }

    let mut parts = Vec::new();
    if !outcome.installed.is_empty() {
        parts.push(format!("Installed: {}", outcome.installed.join(", ")));
    }
    if !outcome.already_installed.is_empty() {
        parts.push(format!(
            "Already installed: {}",
            outcome.already_installed.join(", ")
        ));
    }
    if !outcome.failed.is_empty() {
        parts.push(format!("Failed: {}", outcome.failed.join(", ")));
    }

    let mut comment = parts.join(". ");
    if !outcome.errors.is_empty() {
        let errors: Vec<String> = outcome
            .failed
            .iter()
            .filter_map(|pkg| outcome.errors.get(pkg).map(|msg| format!("{pkg}: {msg}")))
            .collect();
        comment.push_str(&format!("\nErrors: {}", errors.join("; ")));
    }

    let result = StateResult {
        success: outcome.overall_success,
        ..StateResult::ok(name, dry_run, comment)
    };
    outcome
        .installed
        .iter()
        .fold(result, |result, pkg| result.with_change(pkg, Change::installed()))
}

/// Ensure `package` is absent.
pub fn removed(
    backend: &dyn Backend,
    package: &str,
    identity: Option<&str>,
    dry_run: bool,
) -> StateResult {
    match reconcile::remove(package, backend, identity, dry_run) {
        Ok(RemoveOutcome::NotInstalled) => {
            StateResult::ok(package, dry_run, format!("Package {package} is not installed"))
        }
        Ok(RemoveOutcome::WouldRemove) => {
            StateResult::ok(package, true, format!("Would remove: {package}"))
                .with_change(package, Change::removed())
        }
        Ok(RemoveOutcome::Removed) => {
            StateResult::ok(package, false, format!("Successfully removed {package}"))
                .with_change(package, Change::removed())
        }
        Ok(RemoveOutcome::Failed { error }) => StateResult::failed(
            package,
            false,
            format!("Failed to remove {package}: {error}"),
        ),
        Err(e) => StateResult::failed(package, dry_run, e.to_string()),
    }
}

/// Ensure every installed package is at its newest version.
pub fn uptodate(
    name: &str,
    backend: &dyn Backend,
    identity: Option<&str>,
    refresh: bool,
    dry_run: bool,
) -> StateResult {
    match reconcile::upgrade(backend, identity, refresh, dry_run) {
        Ok(UpgradeOutcome::WouldUpgrade) => {
            StateResult::ok(name, true, "Would upgrade all packages")
                .with_change(UPGRADED_KEY, Change::upgraded())
        }
        Ok(UpgradeOutcome::UpToDate) => {
            StateResult::ok(name, false, "All packages are up to date")
        }
        Ok(UpgradeOutcome::Upgraded) => {
            StateResult::ok(name, false, "Packages upgraded successfully")
                .with_change(UPGRADED_KEY, Change::upgraded())
        }
        Ok(UpgradeOutcome::Failed { error }) => {
            StateResult::failed(name, false, format!("Upgrade failed: {error}"))
        }
        Err(e) => StateResult::failed(name, dry_run, e.to_string()),
    }
}

/// What a declared state should converge to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StateAction {
    /// Packages present
    Installed {
        packages: Vec<String>,
        #[serde(default)]
        refresh: bool,
    },
    /// Package absent
    Removed { package: String },
    /// Whole system upgraded
    #[serde(rename = "uptodate")]
    UpToDate {
        #[serde(default = "default_true")]
        refresh: bool,
    },
}

fn default_true() -> bool {
    true
}

/// A named state bound to a backend and an execution identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageState {
    pub name: String,
    pub backend: BackendKind,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(flatten)]
    pub action: StateAction,
}

impl PackageState {
    /// Declare an `installed` state.
    pub fn installed(name: impl Into<String>, backend: BackendKind, packages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            backend,
            identity: None,
            action: StateAction::Installed {
                packages,
                refresh: false,
            },
        }
    }

    /// Declare a `removed` state, named after the package.
    pub fn removed(backend: BackendKind, package: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            name: package.clone(),
            backend,
            identity: None,
            action: StateAction::Removed { package },
        }
    }

    /// Declare an `uptodate` state.
    pub fn uptodate(name: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            name: name.into(),
            backend,
            identity: None,
            action: StateAction::UpToDate { refresh: true },
        }
    }

    /// Run as this user.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the refresh flag (ignored by `removed`).
    pub fn with_refresh(mut self, value: bool) -> Self {
        match &mut self.action {
            StateAction::Installed { refresh, .. } | StateAction::UpToDate { refresh } => {
                *refresh = value;
            }
            StateAction::Removed { .. } => {}
        }
        self
    }

    /// Whether the state runs in a user's context rather than as root.
    pub fn is_user_scoped(&self) -> bool {
        self.backend.requires_identity()
    }

    /// One-line human description.
    pub fn description(&self) -> String {
        let verb = match &self.action {
            StateAction::Installed { packages, .. } => {
                format!("installed ({} package(s))", packages.len())
            }
            StateAction::Removed { package } => format!("removed ({package})"),
            StateAction::UpToDate { .. } => "uptodate".to_string(),
        };
        format!("{}.{verb}", self.backend)
    }

    /// Apply the state through `backend`.
    pub fn apply(&self, backend: &dyn Backend, dry_run: bool) -> StateResult {
        debug!("applying {} ({})", self.name, self.description());
        let identity = self.identity.as_deref();
        match &self.action {
            StateAction::Installed { packages, refresh } => {
                installed(&self.name, backend, packages, identity, *refresh, dry_run)
            }
            StateAction::Removed { package } => removed(backend, package, identity, dry_run),
            StateAction::UpToDate { refresh } => {
                uptodate(&self.name, backend, identity, *refresh, dry_run)
            }
        }
    }
}
