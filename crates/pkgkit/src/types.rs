//! Core types for package reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Installed packages mapped to their versions.
///
/// Always queried fresh from the live system; never cached across calls.
pub type InstalledSnapshot = BTreeMap<String, String>;

/// Supported package manager backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// pacman (system repositories, runs as root)
    Pacman,
    /// yay (AUR helper, refuses to run as root)
    Yay,
}

impl BackendKind {
    /// Get the binary/config name for this backend.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Pacman => "pacman",
            BackendKind::Yay => "yay",
        }
    }

    /// Parse a backend kind from its name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pacman" => Some(BackendKind::Pacman),
            "yay" | "aur" => Some(BackendKind::Yay),
            _ => None,
        }
    }

    /// Whether this backend needs a non-root execution identity.
    pub fn requires_identity(&self) -> bool {
        matches!(self, BackendKind::Yay)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw outcome of one package manager invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    /// Process exit code (-1 when killed by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl RawResult {
    /// Whether the exit code indicates success.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best available failure message: stderr, else stdout, else the exit code.
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exited with status {}", self.exit_code)
    }
}

/// Bounds for blocking package manager calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Read-only queries (`-Q`, `-Ss`, `-Si`)
    pub query: Duration,
    /// Install and remove transactions
    pub install: Duration,
    /// Full system upgrades
    pub upgrade: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(60),
            install: Duration::from_secs(600),
            upgrade: Duration::from_secs(1800),
        }
    }
}

impl Timeouts {
    /// Create timeouts from whole seconds.
    pub fn from_secs(query: u64, install: u64, upgrade: u64) -> Self {
        Self {
            query: Duration::from_secs(query),
            install: Duration::from_secs(install),
            upgrade: Duration::from_secs(upgrade),
        }
    }
}

/// Partition of a desired set against the installed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Packages missing from the system, in desired order
    pub to_install: Vec<String>,
    /// Packages already present
    pub already_installed: Vec<String>,
}

impl ReconciliationPlan {
    /// Whether the system already satisfies the desired set.
    pub fn is_converged(&self) -> bool {
        self.to_install.is_empty()
    }
}

/// Preview of a reconcile call that made no changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunReport {
    /// Packages a real run would install
    pub would_install: Vec<String>,
    /// Packages already present
    pub already_installed: Vec<String>,
}

/// Structured result of an applied reconcile call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Packages installed by this call
    pub installed: Vec<String>,
    /// Packages that were present before the call
    pub already_installed: Vec<String>,
    /// Packages that could not be installed
    pub failed: Vec<String>,
    /// Failure message per failed package
    pub errors: BTreeMap<String, String>,
    /// False iff `failed` is non-empty
    pub overall_success: bool,
}

impl ReconciliationOutcome {
    /// Outcome for a set that needed no changes.
    pub fn converged(already_installed: Vec<String>) -> Self {
        Self {
            already_installed,
            overall_success: true,
            ..Default::default()
        }
    }

    /// Record a package that ended up installed.
    pub fn record_installed(&mut self, name: &str) {
        self.installed.push(name.to_string());
    }

    /// Record a package that failed, with its error message.
    pub fn record_failed(&mut self, name: &str, message: impl Into<String>) {
        self.failed.push(name.to_string());
        self.errors.insert(name.to_string(), message.into());
    }

    /// Seal the outcome, deriving `overall_success` from `failed`.
    pub fn finish(mut self) -> Self {
        self.overall_success = self.failed.is_empty();
        self
    }

    /// Whether this call changed the system.
    pub fn has_changes(&self) -> bool {
        !self.installed.is_empty()
    }
}

/// What a reconcile call returns: a preview or an applied outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Dry run, nothing mutated
    Plan(DryRunReport),
    /// Changes applied (or nothing needed)
    Applied(ReconciliationOutcome),
}

impl Reconciliation {
    /// The applied outcome, if this was not a dry run.
    pub fn outcome(&self) -> Option<&ReconciliationOutcome> {
        match self {
            Reconciliation::Applied(outcome) => Some(outcome),
            Reconciliation::Plan(_) => None,
        }
    }

    /// The dry-run report, if this was a dry run.
    pub fn report(&self) -> Option<&DryRunReport> {
        match self {
            Reconciliation::Plan(report) => Some(report),
            Reconciliation::Applied(_) => None,
        }
    }
}

/// Result of a remove call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// Package was not installed; nothing to do
    NotInstalled,
    /// Dry run: the package would be removed
    WouldRemove,
    /// Package removed
    Removed,
    /// Package manager reported failure
    Failed { error: String },
}

impl RemoveOutcome {
    /// Whether the call succeeded (no failure).
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Marker pacman and yay print when a system upgrade has nothing to do.
pub const UP_TO_DATE_MARKER: &str = "there is nothing to do";

/// Result of an upgrade call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// Dry run: an upgrade would be attempted
    WouldUpgrade,
    /// Upgrade ran and found nothing to do
    UpToDate,
    /// Upgrade ran and changed packages
    Upgraded,
    /// Package manager reported failure
    Failed { error: String },
}

impl UpgradeOutcome {
    /// Classify a finished upgrade invocation.
    pub fn from_raw(raw: &RawResult) -> Self {
        if !raw.success() {
            return Self::Failed {
                error: raw.error_message(),
            };
        }
        if raw.stdout.to_lowercase().contains(UP_TO_DATE_MARKER) {
            Self::UpToDate
        } else {
            Self::Upgraded
        }
    }

    /// Whether the call succeeded (no failure).
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}
