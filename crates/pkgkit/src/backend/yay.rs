//! yay backend (AUR helper, user-scoped).

use super::alpm::{AlpmCli, Exec};
use crate::backend::Backend;
use crate::env::{clean_env, is_unprivileged};
use crate::error::Result;
use crate::runner::CommandRunner;
use crate::types::{BackendKind, InstalledSnapshot, RawResult, Timeouts};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unprivileged account used for read-only queries when no identity is given.
pub const QUERY_FALLBACK_USER: &str = "nobody";

/// Backend that executes `yay`.
///
/// yay refuses to run as root: every mutating verb requires an identity.
/// Read-only queries without one run as [`QUERY_FALLBACK_USER`].
pub struct YayBackend {
    cli: AlpmCli,
}

impl YayBackend {
    /// Create a new YayBackend.
    pub fn new(runner: Arc<dyn CommandRunner>, timeouts: Timeouts) -> Self {
        Self {
            cli: AlpmCli::new("yay", runner, timeouts),
        }
    }

    fn exec<'a>(&self, identity: &'a str) -> Exec<'a> {
        Exec {
            identity: Some(identity),
            env: clean_env(Some(identity)).with_gnupg_home(),
        }
    }

    fn query_exec<'a>(&self, identity: Option<&'a str>) -> Exec<'a> {
        let identity = identity.filter(|user| is_unprivileged(user));
        self.exec(identity.unwrap_or(QUERY_FALLBACK_USER))
    }

    /// Validated identity for a mutating call.
    fn identity<'a>(&self, identity: Option<&'a str>) -> Result<&'a str> {
        self.check_identity(identity)?;
        Ok(identity.unwrap_or(QUERY_FALLBACK_USER))
    }
}

impl Backend for YayBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Yay
    }

    fn is_available(&self) -> bool {
        self.cli
            .version(self.query_exec(None))
            .is_ok_and(|raw| raw.success())
    }

    fn query_installed(&self, identity: Option<&str>) -> Result<InstalledSnapshot> {
        self.cli.query(self.query_exec(identity))
    }

    fn install_many(
        &self,
        names: &[String],
        identity: Option<&str>,
        refresh: bool,
    ) -> Result<RawResult> {
        let user = self.identity(identity)?;
        self.cli.install(self.exec(user), names, refresh)
    }

    fn remove(&self, name: &str, identity: Option<&str>) -> Result<RawResult> {
        let user = self.identity(identity)?;
        self.cli.remove(self.exec(user), name)
    }

    fn upgrade(&self, identity: Option<&str>, refresh: bool) -> Result<RawResult> {
        let user = self.identity(identity)?;
        self.cli.upgrade(self.exec(user), refresh)
    }

    fn sync(&self, identity: Option<&str>) -> Result<RawResult> {
        let user = self.identity(identity)?;
        self.cli.sync(self.exec(user))
    }

    fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<String>> {
        self.cli.search(self.query_exec(identity), query)
    }

    fn info(&self, name: &str, identity: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.cli.info(self.query_exec(identity), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{RecordingRunner, ok};
    use crate::error::ErrorCategory;

    fn backend(runner: &Arc<RecordingRunner>) -> YayBackend {
        YayBackend::new(runner.clone(), Timeouts::default())
    }

    #[test]
    fn test_mutations_without_identity_spawn_nothing() {
        let runner = Arc::new(RecordingRunner::default());
        let yay = backend(&runner);
        let names = vec!["paru-bin".to_string()];

        let errors = [
            yay.install_many(&names, None, false).unwrap_err(),
            yay.install_one("paru-bin", None, true).unwrap_err(),
            yay.remove("paru-bin", None).unwrap_err(),
            yay.upgrade(None, true).unwrap_err(),
            yay.sync(None).unwrap_err(),
            yay.install_many(&names, Some("  "), false).unwrap_err(),
        ];

        for err in &errors {
            assert_eq!(err.category(), ErrorCategory::Precondition);
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_root_identity_is_refused() {
        let runner = Arc::new(RecordingRunner::default());
        let yay = backend(&runner);
        let names = vec!["paru-bin".to_string()];

        let errors = [
            yay.install_many(&names, Some("root"), false).unwrap_err(),
            yay.remove("paru-bin", Some("root")).unwrap_err(),
            yay.upgrade(Some("root"), false).unwrap_err(),
        ];

        for err in &errors {
            assert_eq!(err.category(), ErrorCategory::Precondition);
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_install_runs_as_identity_with_gnupg_home() {
        let runner = Arc::new(RecordingRunner::replying(vec![ok("")]));
        let yay = backend(&runner);

        yay.install_one("paru-bin", Some("admin"), false).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "yay");
        assert_eq!(calls[0].identity.as_deref(), Some("admin"));
        assert_eq!(calls[0].env.get("GNUPGHOME"), Some("/home/admin/.gnupg"));
        assert_eq!(calls[0].args, vec!["-S", "--needed", "--noconfirm", "paru-bin"]);
    }

    #[test]
    fn test_query_without_identity_runs_unprivileged() {
        let runner = Arc::new(RecordingRunner::replying(vec![ok("yay 12.3.5-1\n")]));
        let yay = backend(&runner);

        let snapshot = yay.query_installed(None).unwrap();
        assert!(snapshot.contains_key("yay"));

        let calls = runner.calls();
        assert_eq!(calls[0].identity.as_deref(), Some(QUERY_FALLBACK_USER));
        assert_ne!(calls[0].env.get("USER"), Some("root"));
    }

    #[test]
    fn test_upgrade_uses_long_timeout() {
        let runner = Arc::new(RecordingRunner::replying(vec![ok("")]));
        let yay = backend(&runner);

        yay.upgrade(Some("admin"), true).unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["-Syu", "--noconfirm"]);
        assert_eq!(calls[0].timeout, Timeouts::default().upgrade);
    }
}
