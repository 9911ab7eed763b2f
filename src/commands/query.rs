//! Read-only queries: installed snapshot, search and package info.

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use pkgkit::BackendKind;

use super::{advised, backend, print_json};
use crate::Context;
use crate::cli::TargetArgs;
use crate::ui;

pub fn installed(ctx: &Context, target: TargetArgs) -> Result<()> {
    let kind = BackendKind::from(target.backend);
    let snapshot = backend(ctx, kind)?
        .query_installed(target.user.as_deref())
        .map_err(advised)
        .with_context(|| format!("Could not list {kind} packages"))?;

    if ctx.json {
        return print_json(&snapshot);
    }

    for (name, version) in &snapshot {
        println!("{} {}", name.bold(), version.dimmed());
    }
    if !ctx.quiet {
        ui::dim(&format!("{} package(s) installed", snapshot.len()));
    }
    Ok(())
}

pub fn search(ctx: &Context, query: &str, target: TargetArgs) -> Result<()> {
    let kind = BackendKind::from(target.backend);
    let names = backend(ctx, kind)?
        .search(query, target.user.as_deref())
        .map_err(advised)?;

    if ctx.json {
        return print_json(&names);
    }

    if names.is_empty() && !ctx.quiet {
        ui::info(&format!("No {kind} packages match '{query}'"));
    }
    for name in &names {
        println!("{name}");
    }
    Ok(())
}

pub fn info(ctx: &Context, package: &str, target: TargetArgs) -> Result<()> {
    let kind = BackendKind::from(target.backend);
    let fields = backend(ctx, kind)?
        .info(package, target.user.as_deref())
        .map_err(advised)?;

    if fields.is_empty() {
        bail!("package '{package}' was not found in {kind} repositories");
    }

    if ctx.json {
        return print_json(&fields);
    }

    ui::header(package);
    for (key, value) in &fields {
        ui::kv(key, value);
    }
    Ok(())
}
