//! # pkgkit
//!
//! Pure Rust library for converging pacman and AUR package sets.
//!
//! This crate provides functionality for:
//! - Running package managers under a sanitized environment and identity
//! - Querying, installing, removing and upgrading through a uniform backend
//! - Reconciling a desired package set with batch install and per-package
//!   fallback
//! - Previewing every operation without touching the system (dry run)
//!
//! ## Example
//!
//! ```no_run
//! use pkgkit::{BackendKind, Client};
//!
//! let client = Client::new(BackendKind::Pacman);
//!
//! let desired = vec!["git".to_string(), "htop".to_string()];
//! let result = client.reconcile(&desired, None, false, false).expect("reconcile failed");
//! if let Some(outcome) = result.outcome() {
//!     for name in &outcome.failed {
//!         println!("Failed: {name} ({})", outcome.errors[name]);
//!     }
//! }
//! ```
//!
//! ## Identities
//!
//! `yay` refuses to run as root. Operations on a backend that
//! [requires an identity](backend::Backend::requires_identity) fail with
//! [`Error::IdentityRequired`] before any process is spawned unless a user
//! is supplied:
//!
//! ```no_run
//! use pkgkit::{BackendKind, Client};
//!
//! let client = Client::new(BackendKind::Yay);
//! let desired = vec!["paru-bin".to_string()];
//! client.reconcile(&desired, Some("admin"), true, false).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod env;
pub mod error;
pub mod reconcile;
pub mod runner;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::Backend;
pub use env::{Environment, clean_env};
pub use error::{Error, ErrorCategory, Result};
pub use runner::{CommandRunner, CommandSpec, SystemRunner};
pub use types::{
    BackendKind, DryRunReport, InstalledSnapshot, RawResult, Reconciliation,
    ReconciliationOutcome, ReconciliationPlan, RemoveOutcome, Timeouts, UpgradeOutcome,
};

use std::collections::BTreeMap;
use std::sync::Arc;

/// High-level client for one package manager.
///
/// The client wraps a backend and exposes the reconcile, remove and
/// upgrade operations plus read-only queries.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client for `kind` with real processes and default timeouts.
    pub fn new(kind: BackendKind) -> Self {
        Self::with_timeouts(kind, Timeouts::default())
    }

    /// Create a client for `kind` with custom timeouts.
    pub fn with_timeouts(kind: BackendKind, timeouts: Timeouts) -> Self {
        Self {
            backend: backend::for_kind(kind, Arc::new(SystemRunner::new()), timeouts),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Check if the package manager is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    // =========================================================================
    // Convergence
    // =========================================================================

    /// Converge toward `desired`. See [`reconcile::reconcile`].
    pub fn reconcile(
        &self,
        desired: &[String],
        identity: Option<&str>,
        refresh: bool,
        dry_run: bool,
    ) -> Result<Reconciliation> {
        reconcile::reconcile(desired, self.backend(), identity, refresh, dry_run)
    }

    /// Ensure a package is absent. See [`reconcile::remove`].
    pub fn remove(
        &self,
        name: &str,
        identity: Option<&str>,
        dry_run: bool,
    ) -> Result<RemoveOutcome> {
        reconcile::remove(name, self.backend(), identity, dry_run)
    }

    /// Upgrade all packages. See [`reconcile::upgrade`].
    pub fn upgrade(
        &self,
        identity: Option<&str>,
        refresh: bool,
        dry_run: bool,
    ) -> Result<UpgradeOutcome> {
        reconcile::upgrade(self.backend(), identity, refresh, dry_run)
    }

    /// Refresh the package index.
    pub fn sync(&self, identity: Option<&str>) -> Result<RawResult> {
        self.backend.sync(identity)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// List installed packages with versions.
    pub fn list_installed(&self, identity: Option<&str>) -> Result<InstalledSnapshot> {
        self.backend.query_installed(identity)
    }

    /// Check if a package is installed.
    pub fn is_installed(&self, name: &str, identity: Option<&str>) -> Result<bool> {
        self.backend.is_installed(name, identity)
    }

    /// Search repositories.
    pub fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<String>> {
        self.backend.search(query, identity)
    }

    /// Repository metadata for a package.
    pub fn info(&self, name: &str, identity: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.backend.info(name, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::FakeBackend;

    #[test]
    fn test_client_delegates_to_backend() {
        let client = Client::with_backend(Box::new(
            FakeBackend::privileged().with_installed(&["git", "gitui"]),
        ));

        assert!(client.is_available());
        assert!(client.is_installed("git", None).unwrap());
        assert_eq!(client.search("git", None).unwrap(), vec!["git", "gitui"]);
        assert_eq!(client.info("git", None).unwrap()["Name"], "git");
        assert_eq!(client.list_installed(None).unwrap().len(), 2);
    }

    #[test]
    fn test_client_reconcile_dry_run() {
        let client = Client::with_backend(Box::new(FakeBackend::privileged()));
        let desired = vec!["htop".to_string()];

        let result = client.reconcile(&desired, None, false, true).unwrap();
        assert_eq!(result.report().unwrap().would_install, desired);
        assert!(!client.is_installed("htop", None).unwrap());
    }

    #[test]
    fn test_client_for_each_kind() {
        let pacman = Client::new(BackendKind::Pacman);
        assert_eq!(pacman.backend().kind(), BackendKind::Pacman);
        assert!(!pacman.backend().requires_identity());

        let yay = Client::new(BackendKind::Yay);
        assert!(yay.backend().requires_identity());
        let err = yay.upgrade(None, true, false).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Precondition);
    }
}
