//! pacman backend (system repositories, privileged).

use super::alpm::{AlpmCli, Exec};
use crate::backend::Backend;
use crate::env::clean_env;
use crate::error::Result;
use crate::runner::CommandRunner;
use crate::types::{BackendKind, InstalledSnapshot, RawResult, Timeouts};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backend that executes `pacman`.
///
/// pacman may run as root, so an absent identity means "run privileged".
pub struct PacmanBackend {
    cli: AlpmCli,
}

impl PacmanBackend {
    /// Create a new PacmanBackend.
    pub fn new(runner: Arc<dyn CommandRunner>, timeouts: Timeouts) -> Self {
        Self {
            cli: AlpmCli::new("pacman", runner, timeouts),
        }
    }

    fn exec<'a>(&self, identity: Option<&'a str>) -> Exec<'a> {
        Exec {
            identity,
            env: clean_env(identity),
        }
    }
}

impl Backend for PacmanBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pacman
    }

    fn is_available(&self) -> bool {
        self.cli
            .version(self.exec(None))
            .is_ok_and(|raw| raw.success())
    }

    fn query_installed(&self, identity: Option<&str>) -> Result<InstalledSnapshot> {
        self.cli.query(self.exec(identity))
    }

    fn install_many(
        &self,
        names: &[String],
        identity: Option<&str>,
        refresh: bool,
    ) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.cli.install(self.exec(identity), names, refresh)
    }

    fn remove(&self, name: &str, identity: Option<&str>) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.cli.remove(self.exec(identity), name)
    }

    fn upgrade(&self, identity: Option<&str>, refresh: bool) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.cli.upgrade(self.exec(identity), refresh)
    }

    fn sync(&self, identity: Option<&str>) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.cli.sync(self.exec(identity))
    }

    fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<String>> {
        self.cli.search(self.exec(identity), query)
    }

    fn info(&self, name: &str, identity: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.cli.info(self.exec(identity), name)
    }
}
