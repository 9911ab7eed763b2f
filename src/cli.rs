use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pkgkit::BackendKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgconverge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge pacman and AUR package sets toward a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/pkgconverge/config.toml)
    #[arg(long, global = true, env = "PKGCONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ensure packages are installed
    Installed(InstalledArgs),

    /// Ensure a package is removed
    Removed(RemovedArgs),

    /// Ensure every installed package is up to date
    Uptodate(UptodateArgs),

    /// Converge every package set in the config file
    Apply(ApplyArgs),

    /// List installed packages with versions
    Query(TargetArgs),

    /// Search the repositories
    Search {
        /// Search term
        query: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show repository metadata for a package
    Info {
        /// Package name
        package: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Inspect the config file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Package manager selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Official repositories, run as root
    Pacman,
    /// AUR helper, run as --user
    #[value(alias = "aur")]
    Yay,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Pacman => Self::Pacman,
            BackendArg::Yay => Self::Yay,
        }
    }
}

/// Which package manager to use and as whom
#[derive(Args)]
pub struct TargetArgs {
    /// Package manager
    #[arg(short, long, value_enum, default_value_t = BackendArg::Pacman)]
    pub backend: BackendArg,

    /// Run as this user (required for yay)
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct InstalledArgs {
    /// Packages that must be present
    #[arg(required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Refresh the package database first
    #[arg(long)]
    pub refresh: bool,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct RemovedArgs {
    /// Package that must be absent
    pub package: String,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct UptodateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip refreshing the package database
    #[arg(long)]
    pub no_refresh: bool,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply this set (name, backend, or backend.name)
    #[arg(short, long)]
    pub set: Option<String>,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the config file location and its package sets
    Show,

    /// Check the config file for errors
    Validate,
}
