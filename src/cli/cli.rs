use std::path::PathBuf;

use clap::Parser;

use crate::cli::LogLevel;

/// Keeps a replica directory identical to a source directory, one way.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from
    pub source: Option<PathBuf>,

    /// Directory made identical to the source
    pub replica: Option<PathBuf>,

    /// Seconds between two synchronization passes
    #[arg(allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// File receiving one timestamped line per change
    pub log_file: Option<PathBuf>,

    /// YAML file providing defaults for the settings above
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Run a single pass and exit
    #[clap(long)]
    pub once: bool,

    /// Append to the log file instead of truncating it
    #[clap(long)]
    pub append: bool,

    /// Do not echo changes to stdout
    #[clap(long, short)]
    pub quiet: bool,
}
