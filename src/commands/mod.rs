//! Subcommand implementations.

pub mod apply;
pub mod config;
pub mod query;
pub mod states;

use anyhow::Result;
use pkgkit::{Backend, BackendKind, SystemRunner};
use serde::Serialize;
use std::sync::Arc;

use crate::Context;
use crate::config::Config;

/// Load the config named on the command line (or the default one).
pub fn load_config(ctx: &Context) -> Result<Config> {
    let (config, path) = Config::load(ctx.config.as_deref())?;
    log::debug!("config: {} ({} set(s))", path.display(), config.sets.len());
    Ok(config)
}

/// A real backend for `kind` with the configured timeouts.
pub fn backend(ctx: &Context, kind: BackendKind) -> Result<Box<dyn Backend>> {
    let config = load_config(ctx)?;
    Ok(pkgkit::backend::for_kind(
        kind,
        Arc::new(SystemRunner::new()),
        config.timeouts(),
    ))
}

/// Wrap a package manager error with its category and advice.
pub fn advised(err: pkgkit::Error) -> anyhow::Error {
    let category = err.category();
    let hint = format!("{} - {}", category.description(), category.advice());
    anyhow::Error::new(err).context(hint)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
