use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, error, info};

use crate::application::{PreconditionError, RuntimeConfig};
use crate::cli::Cli;
use crate::config::{ConfigFile, ConfigFileError};
use crate::scheduler::Scheduler;
use crate::sink::{LogSink, LogSinkCreationError};
use crate::sync::SyncError;

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let config_file = match &cli.config {
            Some(path) => ConfigFile::from_path(path).await.context(ConfigFileSnafu)?,
            None => ConfigFile::default(),
        };
        debug!("Loaded config file: {:?}", config_file);

        let config = RuntimeConfig::resolve(cli, config_file).context(PreconditionSnafu)?;
        debug!("Resolved runtime config: {:?}", config);

        let sink =
            LogSink::new(config.log_file.as_deref(), config.append_log).context(LogSinkSnafu)?;
        let mut sink = if config.quiet {
            sink.without_console()
        } else {
            sink
        };
        let scheduler = Scheduler::new(Arc::new(config));

        if scheduler.config().once {
            scheduler
                .run_once(&mut sink)
                .await
                .context(SynchronizationSnafu)?;
            return Ok(());
        }

        let passes = scheduler.run_until(&mut sink, shutdown_signal()).await;
        info!("Stopped after {} synchronization pass(es)", passes);
        Ok(())
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn shutdown_signal() {
    if let Err(err) = compio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, running until killed: {}", err);
        futures::future::pending::<()>().await;
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while reading the config file"))]
    ConfigFileError { source: ConfigFileError },
    #[snafu(display("Refusing to start"))]
    PreconditionError { source: PreconditionError },
    #[snafu(display("Critical failure encountered while opening the change log"))]
    LogSinkError { source: LogSinkCreationError },
    #[snafu(display("Critical failure encountered during synchronization"))]
    SynchronizationError { source: SyncError },
}
