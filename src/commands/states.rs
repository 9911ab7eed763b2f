//! One-shot states: `installed`, `removed` and `uptodate`.

use anyhow::{Result, bail};
use declarative::StateResult;
use pkgkit::BackendKind;

use super::{backend, print_json};
use crate::Context;
use crate::cli::{InstalledArgs, RemovedArgs, UptodateArgs};
use crate::{progress, ui};

pub fn installed(ctx: &Context, args: InstalledArgs) -> Result<()> {
    let kind = BackendKind::from(args.target.backend);
    let backend = backend(ctx, kind)?;

    let pb = progress::spinner(
        &format!("Converging {} package(s) with {kind}", args.packages.len()),
        ctx.hidden(),
    );
    let result = declarative::installed(
        &format!("{kind}.installed"),
        backend.as_ref(),
        &args.packages,
        args.target.user.as_deref(),
        args.refresh,
        args.dry_run,
    );
    pb.finish_and_clear();

    report(ctx, &result)
}

pub fn removed(ctx: &Context, args: RemovedArgs) -> Result<()> {
    let kind = BackendKind::from(args.target.backend);
    let backend = backend(ctx, kind)?;

    let pb = progress::spinner(&format!("Removing {} with {kind}", args.package), ctx.hidden());
    let result = declarative::removed(
        backend.as_ref(),
        &args.package,
        args.target.user.as_deref(),
        args.dry_run,
    );
    pb.finish_and_clear();

    report(ctx, &result)
}

pub fn uptodate(ctx: &Context, args: UptodateArgs) -> Result<()> {
    let kind = BackendKind::from(args.target.backend);
    let backend = backend(ctx, kind)?;

    let pb = progress::spinner(&format!("Upgrading all {kind} packages"), ctx.hidden());
    let result = declarative::uptodate(
        &format!("{kind}.uptodate"),
        backend.as_ref(),
        args.target.user.as_deref(),
        !args.no_refresh,
        args.dry_run,
    );
    pb.finish_and_clear();

    report(ctx, &result)
}

/// Print a result and turn failure into a non-zero exit.
fn report(ctx: &Context, result: &StateResult) -> Result<()> {
    if ctx.json {
        print_json(result)?;
    } else if !ctx.quiet {
        ui::state_result(result);
    }

    if !result.success {
        bail!("state '{}' failed", result.name);
    }
    Ok(())
}
