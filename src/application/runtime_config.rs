use std::fs;
use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use snafu::prelude::*;

use crate::cli::Cli;
use crate::config::ConfigFile;
use crate::ext::BestEffortPathExt;

/// Settings of one run, resolved and validated before the first pass.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: NonZeroU64,
    pub log_file: Option<PathBuf>,
    pub append_log: bool,
    pub once: bool,
    pub quiet: bool,
}

impl RuntimeConfig {
    /// Merges command-line values over config file values and checks that
    /// both roots are existing, disjoint directories.
    pub fn resolve(cli: Cli, file: ConfigFile) -> Result<Self, PreconditionError> {
        let source = cli.source.or(file.source).context(MissingSettingSnafu {
            setting: "source directory",
        })?;
        let replica = cli.replica.or(file.replica).context(MissingSettingSnafu {
            setting: "replica directory",
        })?;
        let raw_interval = cli
            .interval
            .or(file.interval)
            .context(MissingSettingSnafu {
                setting: "synchronization interval",
            })?;
        let interval = u64::try_from(raw_interval)
            .ok()
            .and_then(NonZeroU64::new)
            .context(IntervalSnafu {
                value: raw_interval,
            })?;

        let config = RuntimeConfig {
            source,
            replica,
            interval,
            log_file: cli.log_file.or(file.log_file),
            append_log: cli.append || file.append_log.unwrap_or(false),
            once: cli.once,
            quiet: cli.quiet,
        };
        config.check_roots()?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.get())
    }

    fn check_roots(&self) -> Result<(), PreconditionError> {
        let source = checked_root("Source", &self.source)?;
        let replica = checked_root("Replica", &self.replica)?;

        ensure!(
            !source.starts_with(&replica) && !replica.starts_with(&source),
            NestedRootsSnafu {
                source_root: source,
                replica_root: replica,
            }
        );
        Ok(())
    }
}

/// Canonical form of an existing directory.
fn checked_root(role: &'static str, path: &Path) -> Result<PathBuf, PreconditionError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return RootMissingSnafu { role, path }.fail();
        }
        Err(err) => return Err(err).context(RootAccessSnafu { role, path }),
    };
    ensure!(metadata.is_dir(), NotADirectorySnafu { role, path });

    path.canonicalize().context(RootAccessSnafu { role, path })
}

#[derive(Debug, Snafu)]
pub enum PreconditionError {
    #[snafu(display("No {} given on the command line or in the config file", setting))]
    MissingSetting { setting: &'static str },
    #[snafu(display("Synchronization interval must be a positive number of seconds, got {}", value))]
    IntervalError { value: i64 },
    #[snafu(display("{} directory {} does not exist", role, path.best_effort_path_display()))]
    RootMissingError { role: &'static str, path: PathBuf },
    #[snafu(display("{} path {} is not a directory", role, path.best_effort_path_display()))]
    NotADirectoryError { role: &'static str, path: PathBuf },
    #[snafu(display("Cannot access {} directory {}", role, path.best_effort_path_display()))]
    RootAccessError {
        role: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[snafu(display(
        "Source {} and replica {} must not contain one another",
        source_root.display(),
        replica_root.display()
    ))]
    NestedRootsError {
        source_root: PathBuf,
        replica_root: PathBuf,
    },
}
