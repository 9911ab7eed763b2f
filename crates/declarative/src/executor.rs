//! Execution engine - applies package states in privilege batches

use crate::context::{BackendProvider, ConfirmCallback, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::state::PackageState;
use crate::types::{ExecuteOptions, RunSummary, StateResult};
use anyhow::Result;
use log::info;

/// Execute a plan with the given options and callbacks
///
/// Every state is first previewed (a dry run, which only queries). When
/// `opts.dry_run` is set the previews are the result. Otherwise, if any
/// preview has pending changes, the user is asked to confirm and the
/// states are applied: privileged batch first, then user-scoped, one
/// state at a time.
///
/// # Returns
/// Summary of execution results
pub fn execute<B, P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    backends: &B,
    progress: &mut P,
    confirm: &mut C,
) -> Result<RunSummary>
where
    B: BackendProvider + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let previews: Vec<StateResult> = plan
        .iter()
        .map(|state| state.apply(backends.backend(state.backend), true))
        .collect();
    let pending = previews.iter().filter(|r| r.is_pending()).count();

    if opts.dry_run || pending == 0 {
        return Ok(report_previews(plan, previews, progress));
    }

    if !confirm.confirm(&format!("Apply {pending} pending state(s)?"))? {
        let mut summary = RunSummary::default();
        for result in previews {
            if result.success {
                summary.add_skipped(result);
            } else {
                summary.add_result(result);
            }
        }
        return Ok(summary);
    }

    let mut summary = RunSummary::default();
    for (states, user_scoped) in [(&plan.privileged, false), (&plan.user_scoped, true)] {
        if states.is_empty() {
            continue;
        }
        progress.on_batch_start(states.len(), user_scoped);
        summary.merge(execute_batch(states, backends, progress));
        progress.on_batch_complete();
    }

    info!(
        "applied {} state(s): {} changed, {} unchanged, {} failed",
        summary.total(),
        summary.changed,
        summary.unchanged,
        summary.failed
    );
    Ok(summary)
}

/// Execute a batch of states sequentially
fn execute_batch<B, P>(states: &[PackageState], backends: &B, progress: &mut P) -> RunSummary
where
    B: BackendProvider + ?Sized,
    P: ProgressCallback,
{
    let mut summary = RunSummary::default();
    for state in states {
        progress.on_state_start(&state.name, &state.description());
        let result = state.apply(backends.backend(state.backend), false);
        progress.on_state_complete(&state.name, &result);
        summary.add_result(result);
    }
    summary
}

/// Report dry-run previews through the progress callback
fn report_previews<P: ProgressCallback>(
    plan: &ExecutionPlan,
    previews: Vec<StateResult>,
    progress: &mut P,
) -> RunSummary {
    let mut previews = previews.into_iter();
    let mut summary = RunSummary::default();

    for (states, user_scoped) in [(&plan.privileged, false), (&plan.user_scoped, true)] {
        if states.is_empty() {
            continue;
        }
        progress.on_batch_start(states.len(), user_scoped);
        for (state, result) in states.iter().zip(previews.by_ref()) {
            progress.on_state_start(&state.name, &state.description());
            progress.on_state_complete(&state.name, &result);
            summary.add_result(result);
        }
        progress.on_batch_complete();
    }
    summary
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<B: BackendProvider + ?Sized>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    backends: &B,
) -> Result<RunSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, backends, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use pkgkit::testing::FakeBackend;
    use pkgkit::{Backend, BackendKind};

    struct FakeBackends {
        pacman: FakeBackend,
        yay: FakeBackend,
    }

    impl FakeBackends {
        fn new() -> Self {
            Self {
                pacman: FakeBackend::privileged().with_installed(&["git"]),
                yay: FakeBackend::user_scoped(),
            }
        }
    }

    impl BackendProvider for FakeBackends {
        fn backend(&self, kind: BackendKind) -> &dyn Backend {
            match kind {
                BackendKind::Pacman => &self.pacman,
                BackendKind::Yay => &self.yay,
            }
        }
    }

    /// Records the order of progress events
    #[derive(Default)]
    struct Events(Vec<String>);

    impl ProgressCallback for Events {
        fn on_batch_start(&mut self, count: usize, user_scoped: bool) {
            self.0.push(format!("batch:{count}:{user_scoped}"));
        }
        fn on_state_start(&mut self, name: &str, _description: &str) {
            self.0.push(format!("start:{name}"));
        }
        fn on_state_complete(&mut self, name: &str, result: &StateResult) {
            self.0.push(format!("done:{name}:{}", result.success));
        }
        fn on_batch_complete(&mut self) {
            self.0.push("batch_done".to_string());
        }
    }

    fn plan() -> ExecutionPlan {
        [
            PackageState::installed("aur", BackendKind::Yay, vec!["paru-bin".into()])
                .with_identity("admin"),
            PackageState::installed(
                "base",
                BackendKind::Pacman,
                vec!["git".into(), "htop".into()],
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_execute_empty_plan() {
        let summary =
            execute_simple(&ExecutionPlan::new(), &ExecuteOptions::default(), &FakeBackends::new())
                .unwrap();

        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_execute_no_changes_skips_confirm() {
        let backends = FakeBackends::new();
        let plan: ExecutionPlan =
            [PackageState::installed("base", BackendKind::Pacman, vec!["git".into()])]
                .into_iter()
                .collect();

        let summary = execute(
            &plan,
            &ExecuteOptions::default(),
            &backends,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(backends.pacman.mutating_calls(), 0);
    }

    #[test]
    fn test_execute_applies_privileged_first() {
        let backends = FakeBackends::new();
        let mut events = Events::default();

        let summary = execute(
            &plan(),
            &ExecuteOptions::default(),
            &backends,
            &mut events,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.changed, 2);
        assert!(summary.is_success());
        assert_eq!(summary.results[0].name, "base");
        assert_eq!(
            events.0,
            vec![
                "batch:1:false",
                "start:base",
                "done:base:true",
                "batch_done",
                "batch:1:true",
                "start:aur",
                "done:aur:true",
                "batch_done",
            ]
        );
        assert_eq!(backends.yay.identities().last(), Some(&Some("admin".to_string())));
    }

    #[test]
    fn test_execute_dry_run_mutates_nothing() {
        let backends = FakeBackends::new();
        let opts = ExecuteOptions { dry_run: true };

        let summary = execute_simple(&plan(), &opts, &backends).unwrap();

        assert_eq!(summary.pending, 2);
        assert_eq!(backends.pacman.mutating_calls(), 0);
        assert_eq!(backends.yay.mutating_calls(), 0);
    }

    #[test]
    fn test_execute_declined() {
        let backends = FakeBackends::new();

        let summary = execute(
            &plan(),
            &ExecuteOptions::default(),
            &backends,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(backends.pacman.mutating_calls(), 0);
    }

    #[test]
    fn test_execute_declined_keeps_failures() {
        let backends = FakeBackends::new();
        let plan: ExecutionPlan = [
            PackageState::installed("aur", BackendKind::Yay, vec!["paru-bin".into()]),
            PackageState::installed("base", BackendKind::Pacman, vec!["htop".into()]),
        ]
        .into_iter()
        .collect();

        let summary = execute(
            &plan,
            &ExecuteOptions::default(),
            &backends,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_success());
        assert_eq!(backends.pacman.mutating_calls(), 0);
    }

    #[test]
    fn test_execute_reports_failures() {
        let backends = FakeBackends::new();
        let plan: ExecutionPlan = [
            PackageState::installed("aur", BackendKind::Yay, vec!["paru-bin".into()]),
            PackageState::installed("base", BackendKind::Pacman, vec!["htop".into()]),
        ]
        .into_iter()
        .collect();

        let summary = execute_simple(&plan, &ExecuteOptions::default(), &backends).unwrap();

        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert!(backends.yay.calls().is_empty());
    }
}
