//! Sanitized execution environments.
//!
//! Package managers run with a fixed environment so shell customizations of
//! the invoking user (aliases, extra PATH entries, locale settings) cannot
//! change their behavior or the output format we parse.

use std::collections::BTreeMap;

/// Canonical PATH used for every package manager invocation.
pub const CLEAN_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Locale forced on every invocation.
pub const CLEAN_LOCALE: &str = "C.UTF-8";

/// Account name of the privileged identity.
pub const ROOT_USER: &str = "root";

/// Whether `user` names an unprivileged account (not blank, not root).
pub fn is_unprivileged(user: &str) -> bool {
    let user = user.trim();
    !user.is_empty() && user != ROOT_USER
}

/// A complete, explicit set of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Builder form of [`Environment::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Point GnuPG at the identity's keyring (needed for signed AUR sources).
    pub fn with_gnupg_home(self) -> Self {
        let home = self.get("HOME").unwrap_or("/root").to_string();
        self.with("GNUPGHOME", format!("{home}/.gnupg"))
    }

    /// Iterate variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render as `KEY=value` pairs, as accepted by `env -i`.
    pub fn to_assignments(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Home directory of an execution identity.
pub fn home_dir(identity: Option<&str>) -> String {
    match identity {
        Some(user) => format!("/home/{user}"),
        None => "/root".to_string(),
    }
}

/// Build the sanitized environment for an execution identity.
///
/// `None` means the privileged identity. Pure: reads nothing from the
/// current process environment.
pub fn clean_env(identity: Option<&str>) -> Environment {
    let home = home_dir(identity);
    let user = identity.unwrap_or(ROOT_USER);

    Environment::default()
        .with("HOME", home.as_str())
        .with("USER", user)
        .with("LOGNAME", user)
        .with("LANG", CLEAN_LOCALE)
        .with("LC_ALL", CLEAN_LOCALE)
        .with("PATH", CLEAN_PATH)
        .with("XDG_CACHE_HOME", format!("{home}/.cache"))
        .with("XDG_CONFIG_HOME", format!("{home}/.config"))
        .with("XDG_DATA_HOME", format!("{home}/.local/share"))
}
