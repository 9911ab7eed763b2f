//! # Declarative
//!
//! Declarative package states on top of [`pkgkit`].
//!
//! A state names what a package set should look like; applying it
//! converges the system and returns a uniform [`StateResult`].
//!
//! ## Core Concepts
//!
//! - **installed / removed / uptodate**: the three states, each returning
//!   `{ name, success, dry_run, changes, comment }`
//! - **PackageState**: a state bound to a backend and execution identity
//! - **ExecutionPlan**: states grouped into privileged and user-scoped batches
//! - **Executor**: previews, confirms, then applies a plan
//!
//! ## Example
//!
//! ```no_run
//! use declarative::{Backends, ExecuteOptions, ExecutionPlan, PackageState, execute_simple};
//! use pkgkit::{BackendKind, Timeouts};
//!
//! let plan: ExecutionPlan = [
//!     PackageState::installed("base", BackendKind::Pacman, vec!["git".into()]),
//!     PackageState::installed("aur", BackendKind::Yay, vec!["paru-bin".into()])
//!         .with_identity("admin"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let backends = Backends::system(Timeouts::default());
//! let summary = execute_simple(&plan, &ExecuteOptions::default(), &backends)?;
//! for result in &summary.results {
//!     println!("{}: {}", result.name, result.comment);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`BackendProvider`]: Supplies the backend for each package manager
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations

pub mod context;
pub mod executor;
pub mod planner;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, BackendProvider, Backends, ConfirmCallback, NoProgress,
    ProgressCallback,
};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use state::{PackageState, StateAction, installed, removed, uptodate};
pub use types::{Change, ExecuteOptions, RunSummary, StateResult};
