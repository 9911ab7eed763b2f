//! Command construction shared by the pacman-compatible adapters.
//!
//! `yay` deliberately mirrors pacman's flags, so both adapters build the same
//! argument vectors and differ only in program name, identity policy and
//! environment.

use super::parse;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, CommandSpec};
use crate::types::{InstalledSnapshot, RawResult, Timeouts};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Identity and environment a single invocation runs under.
pub(crate) struct Exec<'a> {
    pub identity: Option<&'a str>,
    pub env: Environment,
}

/// A pacman-compatible command line tool.
pub(crate) struct AlpmCli {
    program: &'static str,
    runner: Arc<dyn CommandRunner>,
    timeouts: Timeouts,
}

impl AlpmCli {
    pub fn new(program: &'static str, runner: Arc<dyn CommandRunner>, timeouts: Timeouts) -> Self {
        Self {
            program,
            runner,
            timeouts,
        }
    }

    fn run(&self, exec: Exec<'_>, args: Vec<String>, timeout: Duration) -> Result<RawResult> {
        let spec = CommandSpec::new(self.program, &args)
            .with_identity(exec.identity)
            .with_env(exec.env)
            .with_timeout(timeout);
        self.runner.run(&spec)
    }

    fn unavailable(&self, message: impl Into<String>) -> Error {
        Error::BackendUnavailable {
            backend: self.program.to_string(),
            message: message.into(),
        }
    }

    pub fn version(&self, exec: Exec<'_>) -> Result<RawResult> {
        self.run(exec, vec!["--version".to_string()], self.timeouts.query)
    }

    pub fn query(&self, exec: Exec<'_>) -> Result<InstalledSnapshot> {
        let raw = self
            .run(exec, vec!["-Q".to_string()], self.timeouts.query)
            .map_err(|e| match e {
                Error::ExecutionFailed { message, .. } => self.unavailable(message),
                other => other,
            })?;

        if raw.success() {
            return Ok(parse::parse_query(&raw.stdout));
        }
        if parse::is_not_found(&raw) {
            return Ok(InstalledSnapshot::new());
        }
        Err(self.unavailable(raw.error_message()))
    }

    pub fn install(&self, exec: Exec<'_>, names: &[String], refresh: bool) -> Result<RawResult> {
        let sync_flag = if refresh { "-Sy" } else { "-S" };
        let mut args = vec![
            sync_flag.to_string(),
            "--needed".to_string(),
            "--noconfirm".to_string(),
        ];
        args.extend(names.iter().cloned());
        self.run(exec, args, self.timeouts.install)
    }

    pub fn remove(&self, exec: Exec<'_>, name: &str) -> Result<RawResult> {
        let args = vec!["-R".to_string(), "--noconfirm".to_string(), name.to_string()];
        self.run(exec, args, self.timeouts.install)
    }

    pub fn upgrade(&self, exec: Exec<'_>, refresh: bool) -> Result<RawResult> {
        let flag = if refresh { "-Syu" } else { "-Su" };
        let args = vec![flag.to_string(), "--noconfirm".to_string()];
        self.run(exec, args, self.timeouts.upgrade)
    }

    pub fn sync(&self, exec: Exec<'_>) -> Result<RawResult> {
        let args = vec!["-Sy".to_string(), "--noconfirm".to_string()];
        self.run(exec, args, self.timeouts.install)
    }

    /// `-Ss` exits 1 when nothing matches, so a failure is an empty result.
    pub fn search(&self, exec: Exec<'_>, query: &str) -> Result<Vec<String>> {
        let raw = self.run(
            exec,
            vec!["-Ss".to_string(), query.to_string()],
            self.timeouts.query,
        )?;
        if !raw.success() {
            return Ok(Vec::new());
        }
        Ok(parse::parse_search(&raw.stdout))
    }

    pub fn info(&self, exec: Exec<'_>, name: &str) -> Result<BTreeMap<String, String>> {
        let raw = self.run(
            exec,
            vec!["-Si".to_string(), name.to_string()],
            self.timeouts.query,
        )?;
        if !raw.success() {
            return Ok(BTreeMap::new());
        }
        Ok(parse::parse_info(&raw.stdout))
    }
}
