mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

impl Context {
    /// Whether decorative output (spinners, banners) is suppressed.
    pub fn hidden(&self) -> bool {
        self.quiet || self.json
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        config: cli.config,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Installed(args) => commands::states::installed(&ctx, args),
        Command::Removed(args) => commands::states::removed(&ctx, args),
        Command::Uptodate(args) => commands::states::uptodate(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Query(target) => commands::query::installed(&ctx, target),
        Command::Search { query, target } => commands::query::search(&ctx, &query, target),
        Command::Info { package, target } => commands::query::info(&ctx, &package, target),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pkgconverge", &mut io::stdout());
            Ok(())
        }
    }
}
