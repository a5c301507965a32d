use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use colored::{Color, Colorize};
use snafu::{ResultExt, Snafu};
use supports_color::Stream;
use tracing::debug;

use crate::ext::BestEffortPathExt;
use crate::sink::ChangeSink;
use crate::sync::{ChangeEvent, ChangeKind};

/// Writes change events as timestamped lines to an optional log file and to stdout.
///
/// Every line is flushed as soon as it is written.
pub struct LogSink {
    file: Option<BufWriter<File>>,
    console: bool,
    colored: bool,
}

impl LogSink {
    pub fn new(log_file: Option<&Path>, append: bool) -> Result<Self, LogSinkCreationError> {
        let file = log_file
            .map(|path| {
                debug!("Opening log file {}", path.best_effort_path_display());
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(path)
                    .map(BufWriter::new)
                    .context(OpenLogSnafu { path })
            })
            .transpose()?;

        Ok(Self {
            file,
            console: true,
            colored: supports_color::on(Stream::Stdout).is_some(),
        })
    }

    /// Stops echoing events to stdout.
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    fn color_of(kind: &ChangeKind) -> Color {
        match kind {
            ChangeKind::DirectoryCreated { .. } | ChangeKind::FileCreated { .. } => Color::Green,
            ChangeKind::FileUpdated { .. } => Color::Yellow,
            ChangeKind::DirectoryRemoved { .. } | ChangeKind::FileRemoved { .. } => Color::Red,
        }
    }
}

impl ChangeSink for LogSink {
    fn record(&mut self, event: &ChangeEvent) -> io::Result<()> {
        let line = event.log_line();

        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{line}")?;
            file.flush()?;
        }

        if self.console {
            if self.colored {
                println!("{}", line.as_str().color(Self::color_of(&event.kind)));
            } else {
                println!("{line}");
            }
        }

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum LogSinkCreationError {
    #[snafu(display("Failed to open log file {}", path.best_effort_path_display()))]
    OpenLogError { path: PathBuf, source: io::Error },
}
