//! Convergence of an installed package set toward a desired one.
//!
//! One generic algorithm drives every [`Backend`]:
//!
//! 1. reject calls that lack a required identity before anything runs
//! 2. partition the desired set against a fresh snapshot
//! 3. stop if nothing is missing (the fixed point: no package manager call)
//! 4. stop with a [`DryRunReport`] when previewing
//! 5. install everything missing in one batch, then verify each package
//! 6. if the batch fails, retry package by package, isolating failures
//!
//! Batch-first saves process spawns and index refreshes, but its exit code is
//! never trusted on its own: managers can succeed while skipping a name, or
//! fail after installing some of the batch.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    DryRunReport, InstalledSnapshot, Reconciliation, ReconciliationOutcome, ReconciliationPlan,
    RemoveOutcome, UpgradeOutcome,
};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Error recorded when a batch reports success but a package is still absent.
pub const NOT_FOUND_AFTER_INSTALL: &str = "reported success but not found after install";

/// Partition `desired` against `snapshot`.
///
/// Duplicates are dropped (first occurrence wins) and the order of
/// `to_install` follows `desired`.
pub fn plan(desired: &[String], snapshot: &InstalledSnapshot) -> ReconciliationPlan {
    let mut seen = HashSet::new();
    let mut plan = ReconciliationPlan::default();

    for name in desired {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if snapshot.contains_key(name) {
            plan.already_installed.push(name.clone());
        } else {
            plan.to_install.push(name.clone());
        }
    }

    plan
}

/// Converge `backend` toward `desired`.
///
/// Precondition and availability errors abort the call; per-package install
/// failures are recorded in the returned outcome.
pub fn reconcile(
    desired: &[String],
    backend: &dyn Backend,
    identity: Option<&str>,
    refresh: bool,
    dry_run: bool,
) -> Result<Reconciliation> {
    backend.check_identity(identity)?;

    let snapshot = backend.query_installed(identity)?;
    let plan = plan(desired, &snapshot);

    if plan.is_converged() {
        debug!(
            "{}: all {} package(s) already installed",
            backend.name(),
            plan.already_installed.len()
        );
        return Ok(Reconciliation::Applied(ReconciliationOutcome::converged(
            plan.already_installed,
        )));
    }

    if dry_run {
        return Ok(Reconciliation::Plan(DryRunReport {
            would_install: plan.to_install,
            already_installed: plan.already_installed,
        }));
    }

    let outcome = apply(&plan, backend, identity, refresh)?;
    info!(
        "{}: installed {}, already installed {}, failed {}",
        backend.name(),
        outcome.installed.len(),
        outcome.already_installed.len(),
        outcome.failed.len()
    );
    Ok(Reconciliation::Applied(outcome))
}

/// Install `plan.to_install`, batch first with per-package fallback.
fn apply(
    plan: &ReconciliationPlan,
    backend: &dyn Backend,
    identity: Option<&str>,
    refresh: bool,
) -> Result<ReconciliationOutcome> {
    let mut outcome = ReconciliationOutcome {
        already_installed: plan.already_installed.clone(),
        ..Default::default()
    };

    let batch = backend.install_many(&plan.to_install, identity, refresh)?;

    if batch.success() {
        let after = backend.query_installed(identity)?;
        for name in &plan.to_install {
            if after.contains_key(name) {
                outcome.record_installed(name);
            } else {
                warn!("{}: {name} {NOT_FOUND_AFTER_INSTALL}", backend.name());
                outcome.record_failed(name, NOT_FOUND_AFTER_INSTALL);
            }
        }
        return Ok(outcome.finish());
    }

    warn!(
        "{}: batch install failed, trying packages individually: {}",
        backend.name(),
        plan.to_install.join(", ")
    );

    // A failed batch may still have installed part of the set.
    let partial = backend.query_installed(identity)?;

    for name in &plan.to_install {
        if partial.contains_key(name) {
            debug!("{}: {name} installed by the failed batch", backend.name());
            outcome.record_installed(name);
            continue;
        }

        let single = backend.install_one(name, identity, refresh)?;
        if single.success() {
            outcome.record_installed(name);
        } else {
            let err = Error::PackageInstallFailed {
                name: name.clone(),
                stderr: single.error_message(),
            };
            warn!("{}: {err}", backend.name());
            outcome.record_failed(name, single.error_message());
        }
    }

    Ok(outcome.finish())
}

/// Ensure `name` is not installed.
pub fn remove(
    name: &str,
    backend: &dyn Backend,
    identity: Option<&str>,
    dry_run: bool,
) -> Result<RemoveOutcome> {
    backend.check_identity(identity)?;

    if !backend.is_installed(name, identity)? {
        return Ok(RemoveOutcome::NotInstalled);
    }
    if dry_run {
        return Ok(RemoveOutcome::WouldRemove);
    }

    let raw = backend.remove(name, identity)?;
    if raw.success() {
        info!("{}: removed {name}", backend.name());
        Ok(RemoveOutcome::Removed)
    } else {
        Ok(RemoveOutcome::Failed {
            error: raw.error_message(),
        })
    }
}

/// Upgrade every package the backend manages.
pub fn upgrade(
    backend: &dyn Backend,
    identity: Option<&str>,
    refresh: bool,
    dry_run: bool,
) -> Result<UpgradeOutcome> {
    backend.check_identity(identity)?;

    if dry_run {
        return Ok(UpgradeOutcome::WouldUpgrade);
    }

    let raw = backend.upgrade(identity, refresh)?;
    Ok(UpgradeOutcome::from_raw(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::testing::FakeBackend;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn applied(result: Reconciliation) -> ReconciliationOutcome {
        match result {
            Reconciliation::Applied(outcome) => outcome,
            Reconciliation::Plan(report) => panic!("expected outcome, got plan {report:?}"),
        }
    }

    #[test]
    fn test_plan_partitions_and_dedupes() {
        let mut snapshot = InstalledSnapshot::new();
        snapshot.insert("git".to_string(), "2.45.1-1".to_string());

        let plan = plan(&names(&["vim", "git", "htop", "vim", "git"]), &snapshot);
        assert_eq!(plan.to_install, names(&["vim", "htop"]));
        assert_eq!(plan.already_installed, names(&["git"]));
    }

    #[test]
    fn test_already_installed_is_a_no_op() {
        let backend = FakeBackend::privileged().with_installed(&["git"]);

        let outcome = applied(reconcile(&names(&["git"]), &backend, None, true, false).unwrap());

        assert_eq!(outcome.already_installed, names(&["git"]));
        assert!(outcome.installed.is_empty());
        assert!(outcome.overall_success);
        assert_eq!(backend.mutating_calls(), 0);
    }

    #[test]
    fn test_second_reconcile_is_idempotent() {
        let backend = FakeBackend::privileged();
        let desired = names(&["vim", "htop"]);

        let first = applied(reconcile(&desired, &backend, None, false, false).unwrap());
        assert_eq!(first.installed, desired);
        let after_first = backend.mutating_calls();

        let second = applied(reconcile(&desired, &backend, None, false, false).unwrap());
        assert!(second.installed.is_empty());
        assert_eq!(second.already_installed, desired);
        assert_eq!(backend.mutating_calls(), after_first);
    }

    #[test]
    fn test_batch_success_converges() {
        let backend = FakeBackend::privileged().with_installed(&["git"]);
        let desired = names(&["git", "vim", "htop"]);

        let outcome = applied(reconcile(&desired, &backend, None, false, false).unwrap());

        assert_eq!(outcome.installed, names(&["vim", "htop"]));
        assert!(outcome.failed.is_empty());
        let installed = backend.query_installed(None).unwrap();
        assert!(desired.iter().all(|name| installed.contains_key(name)));
        assert_eq!(backend.calls(), vec!["query", "install_many:vim,htop", "query", "query"]);
    }

    #[test]
    fn test_batch_success_is_verified_per_package() {
        let backend = FakeBackend::privileged().with_silently_skipped(&["ghost"]);

        let outcome =
            applied(reconcile(&names(&["vim", "ghost"]), &backend, None, false, false).unwrap());

        assert_eq!(outcome.installed, names(&["vim"]));
        assert_eq!(outcome.failed, names(&["ghost"]));
        assert_eq!(outcome.errors["ghost"], NOT_FOUND_AFTER_INSTALL);
        assert!(!outcome.overall_success);
    }

    #[test]
    fn test_fallback_isolates_the_bad_package() {
        let backend = FakeBackend::privileged().with_broken(&["bogus-pkg-xyz"]);

        let outcome = applied(
            reconcile(
                &names(&["vim", "htop", "bogus-pkg-xyz"]),
                &backend,
                None,
                false,
                false,
            )
            .unwrap(),
        );

        assert_eq!(outcome.installed, names(&["vim", "htop"]));
        assert_eq!(outcome.failed, names(&["bogus-pkg-xyz"]));
        assert!(outcome.errors["bogus-pkg-xyz"].contains("target not found"));
        assert!(!outcome.overall_success);
        assert_eq!(
            backend.calls(),
            vec![
                "query",
                "install_many:vim,htop,bogus-pkg-xyz",
                "query",
                "install_one:vim",
                "install_one:htop",
                "install_one:bogus-pkg-xyz",
            ]
        );
    }

    #[test]
    fn test_fallback_keeps_packages_from_partial_batch() {
        let backend = FakeBackend::privileged()
            .with_broken(&["bogus"])
            .with_partial_batch();

        let outcome =
            applied(reconcile(&names(&["vim", "bogus"]), &backend, None, false, false).unwrap());

        assert_eq!(outcome.installed, names(&["vim"]));
        assert_eq!(outcome.failed, names(&["bogus"]));
        assert!(!backend.calls().contains(&"install_one:vim".to_string()));
    }

    #[test]
    fn test_identity_required_spawns_nothing() {
        let backend = FakeBackend::user_scoped();

        let err = reconcile(&names(&["paru-bin"]), &backend, None, false, false).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Precondition);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_user_scoped_with_identity_installs() {
        let backend = FakeBackend::user_scoped();

        let outcome = applied(
            reconcile(&names(&["paru-bin"]), &backend, Some("admin"), false, false).unwrap(),
        );

        assert_eq!(outcome.installed, names(&["paru-bin"]));
        assert_eq!(backend.identities(), vec![Some("admin".to_string()); 3]);
    }

    #[test]
    fn test_dry_run_only_queries() {
        let backend = FakeBackend::privileged().with_installed(&["git"]);

        let result = reconcile(&names(&["git", "vim"]), &backend, None, true, true).unwrap();

        let report = result.report().expect("dry run returns a plan");
        assert_eq!(report.would_install, names(&["vim"]));
        assert_eq!(report.already_installed, names(&["git"]));
        assert_eq!(backend.mutating_calls(), 0);
        assert_eq!(backend.calls(), vec!["query"]);
    }

    #[test]
    fn test_fatal_batch_error_aborts() {
        let backend = FakeBackend::privileged().with_timeout_on_install();

        let err = reconcile(&names(&["vim"]), &backend, None, false, false).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_unavailable_backend_aborts() {
        let backend = FakeBackend::privileged().unavailable();

        let err = reconcile(&names(&["vim"]), &backend, None, false, false).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unavailable);
        assert_eq!(backend.mutating_calls(), 0);
    }

    #[test]
    fn test_remove_not_installed_is_no_op() {
        let backend = FakeBackend::privileged();
        assert_eq!(
            remove("htop", &backend, None, false).unwrap(),
            RemoveOutcome::NotInstalled
        );
        assert_eq!(backend.mutating_calls(), 0);
    }

    #[test]
    fn test_remove_dry_run_and_apply() {
        let backend = FakeBackend::privileged().with_installed(&["htop"]);

        assert_eq!(
            remove("htop", &backend, None, true).unwrap(),
            RemoveOutcome::WouldRemove
        );
        assert_eq!(backend.mutating_calls(), 0);

        assert_eq!(
            remove("htop", &backend, None, false).unwrap(),
            RemoveOutcome::Removed
        );
        assert!(!backend.is_installed("htop", None).unwrap());
    }

    #[test]
    fn test_remove_requires_identity_for_user_scoped() {
        let backend = FakeBackend::user_scoped().with_installed(&["paru-bin"]);
        let err = remove("paru-bin", &backend, None, false).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Precondition);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_upgrade_classification() {
        let backend = FakeBackend::privileged().with_upgrade_output(" there is nothing to do\n");
        assert_eq!(
            upgrade(&backend, None, true, false).unwrap(),
            UpgradeOutcome::UpToDate
        );

        let backend = FakeBackend::privileged().with_upgrade_output("upgrading linux...\n");
        assert_eq!(
            upgrade(&backend, None, true, false).unwrap(),
            UpgradeOutcome::Upgraded
        );
    }

    #[test]
    fn test_upgrade_dry_run_spawns_nothing() {
        let backend = FakeBackend::privileged();
        assert_eq!(
            upgrade(&backend, None, true, true).unwrap(),
            UpgradeOutcome::WouldUpgrade
        );
        assert!(backend.calls().is_empty());
    }
}
