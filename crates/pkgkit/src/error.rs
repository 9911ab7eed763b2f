//! Error types for package operations.
//!
//! Errors are categorized so the reconciler can tell a call-fatal failure
//! (a broken precondition, an unusable package manager, a process that never
//! started or never finished) from a failure scoped to one package, which is
//! recorded and does not stop its siblings.

use thiserror::Error;

/// Categories of package errors for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller broke a precondition (no process was spawned)
    Precondition,
    /// Package manager missing or its query path broken
    Unavailable,
    /// Process could not be spawned
    Execution,
    /// Blocking call exceeded its bound
    Timeout,
    /// A single package failed to install or remove
    Package,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error aborts the whole call.
    ///
    /// Only per-package failures are isolated; everything else stops the
    /// reconcile/remove/upgrade call that hit it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Package)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Precondition => "Precondition not met",
            Self::Unavailable => "Package manager unavailable",
            Self::Execution => "Command could not be started",
            Self::Timeout => "Command timed out",
            Self::Package => "Package operation failed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Precondition => "Pass --user with an unprivileged account for this backend",
            Self::Unavailable => "Check that the package manager and its database are usable",
            Self::Execution => "Check the sanitized PATH and the sudo configuration",
            Self::Timeout => "Raise the timeout in the config or inspect the stuck transaction",
            Self::Package => "Check the package name and the package manager output",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during package operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend refuses the privileged identity and none was supplied
    #[error("{backend} cannot run as root - an execution identity is required")]
    IdentityRequired {
        /// Name of the backend that rejected the call
        backend: String,
    },

    /// Package manager missing or its query failed
    #[error("{backend} unavailable: {message}")]
    BackendUnavailable {
        /// Name of the backend
        backend: String,
        /// What went wrong
        message: String,
    },

    /// Process could not be spawned at all
    #[error("failed to execute {program}: {message}")]
    ExecutionFailed {
        /// Program that failed to start
        program: String,
        /// OS-level error message
        message: String,
    },

    /// Process exceeded its timeout and was killed
    #[error("{program} timed out after {seconds}s")]
    Timeout {
        /// Program that was killed
        program: String,
        /// Timeout that expired
        seconds: u64,
    },

    /// A single package failed
    #[error("failed to install {name}: {stderr}")]
    PackageInstallFailed {
        /// Package name
        name: String,
        /// Standard error of the package manager
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::IdentityRequired { .. } => ErrorCategory::Precondition,
            Error::BackendUnavailable { .. } => ErrorCategory::Unavailable,
            Error::ExecutionFailed { .. } => ErrorCategory::Execution,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::PackageInstallFailed { .. } => ErrorCategory::Package,
            Error::Io(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error aborts the whole call.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    pub(crate) fn identity_required(backend: &str) -> Self {
        Error::IdentityRequired {
            backend: backend.to_string(),
        }
    }
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_package_errors_are_isolated() {
        assert!(ErrorCategory::Precondition.is_fatal());
        assert!(ErrorCategory::Unavailable.is_fatal());
        assert!(ErrorCategory::Execution.is_fatal());
        assert!(ErrorCategory::Timeout.is_fatal());
        assert!(!ErrorCategory::Package.is_fatal());
    }

    #[test]
    fn test_identity_required_message() {
        let err = Error::identity_required("yay");
        assert_eq!(err.category(), ErrorCategory::Precondition);
        assert_eq!(
            err.to_string(),
            "yay cannot run as root - an execution identity is required"
        );
    }

    #[test]
    fn test_package_failure_carries_stderr() {
        let err = Error::PackageInstallFailed {
            name: "bogus".to_string(),
            stderr: "error: target not found: bogus".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("target not found"));
    }

    #[test]
    fn test_timeout_is_fatal() {
        let err = Error::Timeout {
            program: "pacman".to_string(),
            seconds: 600,
        };
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "pacman timed out after 600s");
    }
}
