//! Converge every package set in the config file.

use anyhow::{Result, bail};
use declarative::{Backends, ExecuteOptions, execute};

use super::{load_config, print_json};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::progress::{PromptConfirm, StateProgress};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = load_config(ctx)?;
    if config.sets.is_empty() {
        if !ctx.hidden() {
            ui::warn("No package sets configured - nothing to apply");
        }
        return Ok(());
    }

    let plan = config.plan().filter_by_target(args.set.as_deref());
    if plan.is_empty() {
        bail!(
            "no package set matches '{}'",
            args.set.as_deref().unwrap_or_default()
        );
    }

    if !ctx.hidden() {
        ui::info(&format!("Checking {} package set(s)...", plan.total_states()));
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
    };
    let backends = Backends::system(config.timeouts());
    let summary = execute(
        &plan,
        &opts,
        &backends,
        &mut StateProgress::new(ctx.hidden()),
        &mut PromptConfirm {
            yes: args.yes || ctx.json,
        },
    )?;

    if ctx.json {
        print_json(&summary)?;
    } else if !ctx.quiet {
        ui::summary(&summary, args.dry_run);
    }

    if !summary.is_success() {
        bail!("{} package set(s) failed", summary.failed);
    }
    Ok(())
}
