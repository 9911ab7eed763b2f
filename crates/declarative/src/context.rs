//! Provider traits for the executor
//!
//! These traits allow the declarative crate to be used without
//! depending on specific backends, progress displays or prompts.

use crate::types::StateResult;
use anyhow::Result;
use pkgkit::{Backend, BackendKind, CommandRunner, SystemRunner, Timeouts};
use std::sync::Arc;

/// Provider of a backend for each package manager kind
///
/// Implement this trait to decide how backends are built (real processes,
/// custom timeouts, fakes in tests).
pub trait BackendProvider {
    /// The backend that executes states declared for `kind`
    fn backend(&self, kind: BackendKind) -> &dyn Backend;
}

/// One backend per kind, built up front.
pub struct Backends {
    pacman: Box<dyn Backend>,
    yay: Box<dyn Backend>,
}

impl Backends {
    /// Use these backends.
    pub fn new(pacman: Box<dyn Backend>, yay: Box<dyn Backend>) -> Self {
        Self { pacman, yay }
    }

    /// Real backends with the given timeouts.
    pub fn system(timeouts: Timeouts) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
        Self {
            pacman: pkgkit::backend::for_kind(BackendKind::Pacman, runner.clone(), timeouts),
            yay: pkgkit::backend::for_kind(BackendKind::Yay, runner, timeouts),
        }
    }
}

impl BackendProvider for Backends {
    fn backend(&self, kind: BackendKind) -> &dyn Backend {
        match kind {
            BackendKind::Pacman => self.pacman.as_ref(),
            BackendKind::Yay => self.yay.as_ref(),
        }
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when starting to apply a batch of states
    fn on_batch_start(&mut self, count: usize, user_scoped: bool);

    /// Called when starting to apply a single state
    fn on_state_start(&mut self, name: &str, description: &str);

    /// Called when a state application completes
    fn on_state_complete(&mut self, name: &str, result: &StateResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize, _user_scoped: bool) {}
    fn on_state_start(&mut self, _name: &str, _description: &str) {}
    fn on_state_complete(&mut self, _name: &str, _result: &StateResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
