//! Config file inspection commands.

use anyhow::Result;

use super::print_json;
use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let (config, path) = Config::load(ctx.config.as_deref())?;

    if ctx.json {
        return print_json(&config);
    }

    ui::header("Config");
    ui::kv("path", &path.display().to_string());
    ui::kv("exists", if path.exists() { "yes" } else { "no (defaults)" });
    ui::kv(
        "timeouts",
        &format!(
            "query {}s, install {}s, upgrade {}s",
            config.timeouts.query_secs, config.timeouts.install_secs, config.timeouts.upgrade_secs
        ),
    );

    if config.sets.is_empty() {
        ui::dim("no package sets");
        return Ok(());
    }

    ui::header("Package sets");
    for set in &config.sets {
        let user = set.user.as_deref().unwrap_or("root");
        ui::kv(
            &set.name,
            &format!(
                "{}.{} as {user}: {}",
                set.backend,
                set.state.as_str(),
                set.packages.join(" ")
            ),
        );
    }
    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    let (config, path) = Config::load(ctx.config.as_deref())?;
    if !ctx.hidden() {
        ui::success(&format!(
            "{} is valid ({} package set(s))",
            path.display(),
            config.sets.len()
        ));
    }
    Ok(())
}
