use anyhow::{Context, Result, bail};
use declarative::{ExecutionPlan, PackageState};
use pkgkit::env::is_unprivileged;
use pkgkit::{BackendKind, Timeouts};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("pkgconverge"))
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Upper bound for any configured timeout: one day.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub sets: Vec<PackageSet>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    pub query_secs: u64,
    pub install_secs: u64,
    pub upgrade_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            query_secs: defaults.query.as_secs(),
            install_secs: defaults.install.as_secs(),
            upgrade_secs: defaults.upgrade.as_secs(),
        }
    }
}

/// What a set converges its packages to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetState {
    #[default]
    Installed,
    Removed,
    Uptodate,
}

impl SetState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Removed => "removed",
            Self::Uptodate => "uptodate",
        }
    }
}

/// A named set of packages converged through one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSet {
    pub name: String,
    pub backend: BackendKind,
    #[serde(default)]
    pub state: SetState,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl PackageSet {
    /// The declarative states this set converges to.
    ///
    /// `removed` yields one state per package, named after it.
    pub fn to_states(&self) -> Vec<PackageState> {
        let states = match self.state {
            SetState::Installed => vec![
                PackageState::installed(&self.name, self.backend, self.packages.clone())
                    .with_refresh(self.refresh),
            ],
            SetState::Removed => self
                .packages
                .iter()
                .map(|pkg| PackageState::removed(self.backend, pkg))
                .collect(),
            SetState::Uptodate => vec![
                PackageState::uptodate(&self.name, self.backend).with_refresh(self.refresh),
            ],
        };
        match &self.user {
            Some(user) => states.into_iter().map(|s| s.with_identity(user)).collect(),
            None => states,
        }
    }
}

impl Config {
    /// Load from `path`, or the default location.
    ///
    /// A missing file yields the default config.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok((Self::default(), path));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok((config, path))
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural rules the TOML schema cannot express.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        if t.query_secs == 0 || t.install_secs == 0 || t.upgrade_secs == 0 {
            bail!("timeouts must be greater than zero");
        }
        let longest = t.query_secs.max(t.install_secs).max(t.upgrade_secs);
        if longest > MAX_TIMEOUT_SECS {
            bail!("timeouts must not exceed {MAX_TIMEOUT_SECS} seconds, got {longest}");
        }

        let mut seen = HashSet::new();
        for set in &self.sets {
            if set.name.trim().is_empty() {
                bail!("package set with an empty name");
            }
            if !seen.insert(set.name.as_str()) {
                bail!("duplicate package set '{}'", set.name);
            }
            if set.state == SetState::Uptodate && !set.packages.is_empty() {
                bail!("set '{}' is uptodate and takes no packages", set.name);
            }
            if let Some(pkg) = set.packages.iter().find(|p| p.trim().is_empty()) {
                bail!("set '{}' contains an empty package name {pkg:?}", set.name);
            }
            let has_user = set.user.as_deref().is_some_and(is_unprivileged);
            if set.backend.requires_identity() && !has_user {
                bail!(
                    "set '{}' uses {} and must name a user - {} cannot run as root",
                    set.name,
                    set.backend,
                    set.backend
                );
            }
        }
        Ok(())
    }

    /// Timeouts for backend calls.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(
            self.timeouts.query_secs,
            self.timeouts.install_secs,
            self.timeouts.upgrade_secs,
        )
    }

    /// The states of every set, in declaration order.
    pub fn plan(&self) -> ExecutionPlan {
        self.sets.iter().flat_map(PackageSet::to_states).collect()
    }
}
