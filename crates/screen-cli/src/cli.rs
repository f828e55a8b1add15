use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "DockScreen - checkpointed, parallel virtual screening of ligand archives against a fixed receptor.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of candidates processed concurrently.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Screen one or more candidate archives against a docking configuration.
    Run(RunArgs),
    /// Convert archives into dock-ready ligand files without docking them.
    Convert(ConvertArgs),
    /// Set up, inspect or check the checkpoint ledger.
    Ledger(LedgerArgs),
}

/// Connection settings for the checkpoint ledger store.
#[derive(Args, Debug, Clone, Default)]
pub struct LedgerConnectionArgs {
    /// Ledger store address, overriding the settings file.
    #[arg(long = "ledger", value_name = "HOST[:PORT][/DB]")]
    pub address: Option<String>,

    /// Password for the ledger store.
    #[arg(long = "ledger-password", value_name = "PASSWORD")]
    pub password: Option<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Docking engine configuration file (receptor, search box, exhaustiveness).
    #[arg(required = true, value_name = "CONFIG")]
    pub docking_config: PathBuf,

    /// Candidate archives, gzip-compressed or plain, screened one after another.
    #[arg(required = true, num_args = 1.., value_name = "ARCHIVE")]
    pub archives: Vec<PathBuf>,

    /// Path to a settings file in TOML format.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Minimum affinity for a candidate to be promoted.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub cutoff: Option<f64>,

    /// Directory receiving intermediate files, the binders and the score report.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub ledger: LedgerConnectionArgs,

    /// Skip delivery of promoted binders, even if the settings file configures it.
    #[arg(long)]
    pub no_delivery: bool,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S converter.partial-charge=mmff94
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Candidate archives, gzip-compressed or plain, converted one after another.
    #[arg(required = true, num_args = 1.., value_name = "ARCHIVE")]
    pub archives: Vec<PathBuf>,

    /// Parent directory for the converted files. Each archive gets a subdirectory
    /// named after it; without this flag that subdirectory sits next to the archive.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Path to a settings file in TOML format.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S converter.partial-charge=mmff94
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `ledger` subcommand.
#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommands,

    /// Path to a settings file in TOML format.
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    #[command(flatten)]
    pub connection: LedgerConnectionArgs,
}

/// Available commands for the checkpoint ledger.
#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// Write a store configuration that persists the ledger into the output directory.
    Setup {
        /// Directory that will hold the store configuration and its snapshots.
        #[arg(short, long, value_name = "PATH")]
        output_dir: Option<PathBuf>,

        /// Seconds between snapshots of the ledger.
        #[arg(long, value_name = "SECS")]
        save_interval: Option<u64>,
    },
    /// Show what the ledger recorded for the given candidates.
    Show {
        #[arg(required = true, num_args = 1.., value_name = "ID")]
        ids: Vec<String>,
    },
    /// Check that the ledger store is reachable.
    Ping,
}
