//! In-memory backend for tests.
//!
//! [`FakeBackend`] keeps an installed set in memory, records every call it
//! receives (with the identity it was made under) and can be scripted to
//! fail the way real package managers do.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{BackendKind, InstalledSnapshot, RawResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Call names that never mutate the system.
const READ_ONLY_CALLS: &[&str] = &["query", "search", "info"];

/// Scriptable in-memory backend that records its calls.
pub struct FakeBackend {
    kind: BackendKind,
    installed: Mutex<InstalledSnapshot>,
    broken: HashSet<String>,
    silently_skipped: HashSet<String>,
    partial_batch: bool,
    timeout_on_install: bool,
    unavailable: bool,
    upgrade_output: String,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeBackend {
    fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            installed: Mutex::new(InstalledSnapshot::new()),
            broken: HashSet::new(),
            silently_skipped: HashSet::new(),
            partial_batch: false,
            timeout_on_install: false,
            unavailable: false,
            upgrade_output: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Behaves like pacman: no identity needed.
    pub fn privileged() -> Self {
        Self::new(BackendKind::Pacman)
    }

    /// Behaves like yay: mutations need an identity.
    pub fn user_scoped() -> Self {
        Self::new(BackendKind::Yay)
    }

    /// Start with these packages installed.
    pub fn with_installed(self, names: &[&str]) -> Self {
        {
            let mut installed = self.installed.lock().unwrap();
            for name in names {
                installed.insert(name.to_string(), "1.0-1".to_string());
            }
        }
        self
    }

    /// These packages fail to install; a batch containing one fails.
    pub fn with_broken(mut self, names: &[&str]) -> Self {
        self.broken.extend(names.iter().map(|s| s.to_string()));
        self
    }

    /// A batch succeeds but does not actually install these.
    pub fn with_silently_skipped(mut self, names: &[&str]) -> Self {
        self.silently_skipped
            .extend(names.iter().map(|s| s.to_string()));
        self
    }

    /// A failing batch still installs its good packages.
    pub fn with_partial_batch(mut self) -> Self {
        self.partial_batch = true;
        self
    }

    /// Install calls time out.
    pub fn with_timeout_on_install(mut self) -> Self {
        self.timeout_on_install = true;
        self
    }

    /// Queries fail as if the package database were unreadable.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Stdout returned by upgrade.
    pub fn with_upgrade_output(mut self, stdout: &str) -> Self {
        self.upgrade_output = stdout.to_string();
        self
    }

    /// Recorded call names, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Identity of each recorded call, in order.
    pub fn identities(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, identity)| identity.clone())
            .collect()
    }

    /// Number of recorded calls that could have changed the system.
    pub fn mutating_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !READ_ONLY_CALLS.contains(&call.as_str()))
            .count()
    }

    fn record(&self, call: impl Into<String>, identity: Option<&str>) {
        self.calls
            .lock()
            .unwrap()
            .push((call.into(), identity.map(str::to_string)));
    }

    fn mark_installed(&self, name: &str) {
        self.installed
            .lock()
            .unwrap()
            .insert(name.to_string(), "1.0-1".to_string());
    }

    fn not_found(name: &str) -> RawResult {
        RawResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: format!("error: target not found: {name}"),
        }
    }

    fn install_timeout(&self) -> Error {
        Error::Timeout {
            program: self.kind.name().to_string(),
            seconds: 600,
        }
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn query_installed(&self, identity: Option<&str>) -> Result<InstalledSnapshot> {
        self.record("query", identity);
        if self.unavailable {
            return Err(Error::BackendUnavailable {
                backend: self.kind.name().to_string(),
                message: "error: could not open database".to_string(),
            });
        }
        Ok(self.installed.lock().unwrap().clone())
    }

    fn install_many(
        &self,
        names: &[String],
        identity: Option<&str>,
        _refresh: bool,
    ) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.record(format!("install_many:{}", names.join(",")), identity);
        if self.timeout_on_install {
            return Err(self.install_timeout());
        }

        if let Some(bad) = names.iter().find(|n| self.broken.contains(*n)) {
            if self.partial_batch {
                names
                    .iter()
                    .filter(|n| !self.broken.contains(*n))
                    .for_each(|n| self.mark_installed(n));
            }
            return Ok(Self::not_found(bad));
        }

        names
            .iter()
            .filter(|n| !self.silently_skipped.contains(*n))
            .for_each(|n| self.mark_installed(n));
        Ok(RawResult::default())
    }

    fn install_one(&self, name: &str, identity: Option<&str>, _refresh: bool) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.record(format!("install_one:{name}"), identity);
        if self.timeout_on_install {
            return Err(self.install_timeout());
        }
        if self.broken.contains(name) {
            return Ok(Self::not_found(name));
        }
        self.mark_installed(name);
        Ok(RawResult::default())
    }

    fn remove(&self, name: &str, identity: Option<&str>) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.record(format!("remove:{name}"), identity);
        if self.installed.lock().unwrap().remove(name).is_none() {
            return Ok(Self::not_found(name));
        }
        Ok(RawResult::default())
    }

    fn upgrade(&self, identity: Option<&str>, _refresh: bool) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.record("upgrade", identity);
        Ok(RawResult {
            exit_code: 0,
            stdout: self.upgrade_output.clone(),
            stderr: String::new(),
        })
    }

    fn sync(&self, identity: Option<&str>) -> Result<RawResult> {
        self.check_identity(identity)?;
        self.record("sync", identity);
        Ok(RawResult::default())
    }

    fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<String>> {
        self.record("search", identity);
        Ok(self
            .installed
            .lock()
            .unwrap()
            .keys()
            .filter(|name| name.contains(query))
            .cloned()
            .collect())
    }

    fn info(&self, name: &str, identity: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.record("info", identity);
        let mut info = BTreeMap::new();
        if let Some(version) = self.installed.lock().unwrap().get(name) {
            info.insert("Name".to_string(), name.to_string());
            info.insert("Version".to_string(), version.clone());
        }
        Ok(info)
    }
}
