use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use derive_more::Display;

/// Timestamp layout used when a change is written out as a log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One action the synchronizer applied to the replica.
///
/// Directory and removal events carry the full replica path but render only
/// its last segment; copy events render both full paths.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ChangeKind {
    #[display("Directory removed: {}", base_name(path))]
    DirectoryRemoved { path: PathBuf },
    #[display("Created new Subdirectory {}", base_name(path))]
    DirectoryCreated { path: PathBuf },
    #[display("File removed from replica: {}", base_name(path))]
    FileRemoved { path: PathBuf },
    #[display("Created new file {} to {}", source.display(), replica.display())]
    FileCreated { source: PathBuf, replica: PathBuf },
    #[display("Copied file {} to {}", source.display(), replica.display())]
    FileUpdated { source: PathBuf, replica: PathBuf },
}

impl ChangeKind {
    /// The replica path the action was applied to.
    pub fn replica_path(&self) -> &Path {
        match self {
            ChangeKind::DirectoryRemoved { path }
            | ChangeKind::DirectoryCreated { path }
            | ChangeKind::FileRemoved { path } => path,
            ChangeKind::FileCreated { replica, .. } | ChangeKind::FileUpdated { replica, .. } => {
                replica
            }
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{kind}")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub timestamp: DateTime<Local>,
}

impl ChangeEvent {
    pub fn now(kind: ChangeKind) -> Self {
        Self {
            kind,
            timestamp: Local::now(),
        }
    }

    /// `<timestamp>: <message>`, the line persisted to the log file.
    pub fn log_line(&self) -> String {
        format!("{}: {}", self.timestamp.format(TIMESTAMP_FORMAT), self.kind)
    }
}
