//! Backend abstraction for package manager operations.
//!
//! The [`Backend`] trait is the capability contract every package manager
//! adapter implements, allowing the reconciler to drive `pacman`, `yay` or a
//! test double through the same code path.

mod alpm;
pub mod pacman;
pub mod parse;
pub mod yay;

use crate::env::is_unprivileged;
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, SystemRunner};
use crate::types::{BackendKind, InstalledSnapshot, RawResult, Timeouts};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backend trait for package manager operations.
///
/// Mutating verbs return the [`RawResult`] of the invocation; interpreting
/// exit codes is left to the reconciler. Every mutating verb must call
/// [`Backend::check_identity`] before spawning anything.
pub trait Backend: Send + Sync {
    /// Which package manager this is.
    fn kind(&self) -> BackendKind;

    /// Backend name for messages.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Whether the package manager refuses to run as the privileged identity.
    fn requires_identity(&self) -> bool {
        self.kind().requires_identity()
    }

    /// Check if the package manager binary responds.
    fn is_available(&self) -> bool;

    /// List installed packages with versions.
    fn query_installed(&self, identity: Option<&str>) -> Result<InstalledSnapshot>;

    /// Check if a single package is installed.
    ///
    /// Defined through [`Backend::query_installed`] so the two can never
    /// disagree.
    fn is_installed(&self, name: &str, identity: Option<&str>) -> Result<bool> {
        Ok(self.query_installed(identity)?.contains_key(name))
    }

    /// Install all `names` in one invocation.
    fn install_many(
        &self,
        names: &[String],
        identity: Option<&str>,
        refresh: bool,
    ) -> Result<RawResult>;

    /// Install a single package.
    fn install_one(&self, name: &str, identity: Option<&str>, refresh: bool) -> Result<RawResult> {
        self.install_many(&[name.to_string()], identity, refresh)
    }

    /// Remove a package.
    fn remove(&self, name: &str, identity: Option<&str>) -> Result<RawResult>;

    /// Upgrade every installed package.
    fn upgrade(&self, identity: Option<&str>, refresh: bool) -> Result<RawResult>;

    /// Refresh the package index without installing anything.
    fn sync(&self, identity: Option<&str>) -> Result<RawResult>;

    /// Search repositories for packages matching `query`.
    fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<String>>;

    /// Repository metadata for a package (empty if unknown).
    fn info(&self, name: &str, identity: Option<&str>) -> Result<BTreeMap<String, String>>;

    /// Fail with [`Error::IdentityRequired`] if this backend needs an
    /// identity and none was supplied. A blank name or root counts as none.
    fn check_identity(&self, identity: Option<&str>) -> Result<()> {
        let missing = !identity.is_some_and(is_unprivileged);
        if self.requires_identity() && missing {
            return Err(Error::identity_required(self.name()));
        }
        Ok(())
    }
}

/// Create the backend for `kind`, executing through `runner`.
pub fn for_kind(
    kind: BackendKind,
    runner: Arc<dyn CommandRunner>,
    timeouts: Timeouts,
) -> Box<dyn Backend> {
    match kind {
        BackendKind::Pacman => Box::new(pacman::PacmanBackend::new(runner, timeouts)),
        BackendKind::Yay => Box::new(yay::YayBackend::new(runner, timeouts)),
    }
}

/// Get the default backend for `kind` (real processes, default timeouts).
pub fn default_backend(kind: BackendKind) -> Box<dyn Backend> {
    for_kind(kind, Arc::new(SystemRunner::new()), Timeouts::default())
}
