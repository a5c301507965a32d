use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::compare::{DigestError, files_equal};
use crate::ext::BestEffortPathExt;
use crate::sink::ChangeSink;
use crate::sync::{ChangeEvent, ChangeKind, CopyError, LevelSnapshot, copy_file};

/// Makes `replica` mirror `source`, reporting every applied action to `sink`.
///
/// Both roots must exist. Returns the number of events emitted. The first
/// failing entry aborts the pass; whatever was applied before it stays applied.
/// Source entries that disappear while the pass runs are skipped.
pub async fn synchronize_tree<S: ChangeSink + ?Sized>(
    source: &Path,
    replica: &Path,
    sink: &mut S,
) -> Result<usize, SyncError> {
    let mut pass = SyncPass { sink, emitted: 0 };
    pass.sync_level(source, replica, true).await?;
    Ok(pass.emitted)
}

/// Same as [`synchronize_tree`], returning the events instead of forwarding them.
pub async fn synchronize_tree_collect(
    source: &Path,
    replica: &Path,
) -> Result<Vec<ChangeEvent>, SyncError> {
    let mut events = Vec::new();
    synchronize_tree(source, replica, &mut events).await?;
    Ok(events)
}

struct SyncPass<'a, S: ?Sized> {
    sink: &'a mut S,
    emitted: usize,
}

impl<S: ChangeSink + ?Sized> SyncPass<'_, S> {
    fn emit(&mut self, kind: ChangeKind) -> Result<(), SyncError> {
        let event = ChangeEvent::now(kind);
        self.sink.record(&event).context(SinkSnafu {
            path: event.kind.replica_path(),
        })?;
        self.emitted += 1;
        Ok(())
    }

    async fn sync_level(
        &mut self,
        source: &Path,
        replica: &Path,
        is_root: bool,
    ) -> Result<(), SyncError> {
        let source_level = match LevelSnapshot::read(source) {
            Ok(level) => level,
            Err(err) if !is_root && err.kind() == io::ErrorKind::NotFound => {
                debug!("Source directory {} vanished, skipping it", source.display());
                return Ok(());
            }
            Err(err) => Err(err).context(ListSnafu { path: source })?,
        };
        let mut replica_level = LevelSnapshot::read(replica).context(ListSnafu { path: replica })?;

        self.remove_stale_directories(&source_level, &replica_level, replica)?;
        self.create_missing_directories(&source_level, &mut replica_level, replica)
            .await?;

        for name in &source_level.directories {
            Box::pin(self.sync_level(&source.join(name), &replica.join(name), false)).await?;
        }

        self.remove_stale_files(&source_level, &replica_level, replica)
            .await?;
        self.copy_source_files(&source_level, &replica_level, source, replica)
            .await
    }

    fn remove_stale_directories(
        &mut self,
        source_level: &LevelSnapshot,
        replica_level: &LevelSnapshot,
        replica: &Path,
    ) -> Result<(), SyncError> {
        for name in replica_level
            .directories
            .difference(&source_level.directories)
        {
            let path = replica.join(name);
            fs::remove_dir_all(&path).context(RemoveDirectorySnafu { path: &path })?;
            self.emit(ChangeKind::DirectoryRemoved { path })?;
        }
        Ok(())
    }

    async fn create_missing_directories(
        &mut self,
        source_level: &LevelSnapshot,
        replica_level: &mut LevelSnapshot,
        replica: &Path,
    ) -> Result<(), SyncError> {
        let missing: Vec<OsString> = source_level
            .directories
            .difference(&replica_level.directories)
            .cloned()
            .collect();

        for name in missing {
            let path = replica.join(&name);
            if replica_level.take_non_directory(&name) {
                self.remove_non_directory(&path).await?;
            }
            compio::fs::create_dir(&path)
                .await
                .context(CreateDirectorySnafu { path: &path })?;
            replica_level.directories.insert(name);
            self.emit(ChangeKind::DirectoryCreated { path })?;
        }
        Ok(())
    }

    async fn remove_stale_files(
        &mut self,
        source_level: &LevelSnapshot,
        replica_level: &LevelSnapshot,
        replica: &Path,
    ) -> Result<(), SyncError> {
        let mut stale: Vec<&OsString> = replica_level
            .files
            .iter()
            .chain(&replica_level.foreign)
            .filter(|name| !source_level.files.contains(*name))
            .collect();
        stale.sort();

        for name in stale {
            self.remove_non_directory(&replica.join(name)).await?;
        }
        Ok(())
    }

    async fn remove_non_directory(&mut self, path: &Path) -> Result<(), SyncError> {
        compio::fs::remove_file(path)
            .await
            .context(RemoveFileSnafu { path })?;
        self.emit(ChangeKind::FileRemoved {
            path: path.to_path_buf(),
        })
    }

    async fn copy_source_files(
        &mut self,
        source_level: &LevelSnapshot,
        replica_level: &LevelSnapshot,
        source: &Path,
        replica: &Path,
    ) -> Result<(), SyncError> {
        for name in &source_level.files {
            let from = source.join(name);
            let to = replica.join(name);

            if replica_level.foreign.contains(name) {
                self.remove_non_directory(&to).await?;
            }

            if !replica_level.files.contains(name) {
                if self.transfer(&from, &to).await? {
                    self.emit(ChangeKind::FileCreated {
                        source: from,
                        replica: to,
                    })?;
                }
                continue;
            }

            let equal = match files_equal(&from, &to).await {
                Ok(equal) => equal,
                Err(err) if is_vanished_source(&err, &from) => {
                    debug!("Source file {} vanished, skipping it", from.display());
                    continue;
                }
                Err(err) => Err(err).context(CompareSnafu)?,
            };
            if equal {
                continue;
            }

            if self.transfer(&from, &to).await? {
                self.emit(ChangeKind::FileUpdated {
                    source: from,
                    replica: to,
                })?;
            }
        }
        Ok(())
    }

    /// Copies `from` over `to`; `false` when the source vanished first.
    async fn transfer(&mut self, from: &Path, to: &Path) -> Result<bool, SyncError> {
        match copy_file(from, to).await {
            Ok(bytes) => {
                debug!("Copied {} bytes from {}", bytes, from.display());
                Ok(true)
            }
            Err(err) if err.is_source_vanished() => {
                debug!("Source file {} vanished, skipping it", from.display());
                Ok(false)
            }
            Err(err) => Err(err).context(TransferSnafu),
        }
    }
}

fn is_vanished_source(err: &DigestError, source: &Path) -> bool {
    err.path() == source && err.io_error().kind() == io::ErrorKind::NotFound
}

#[derive(Debug, Snafu)]
pub enum SyncError {
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ListError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove replica directory {}", path.best_effort_path_display()))]
    RemoveDirectoryError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to create replica directory {}", path.best_effort_path_display()))]
    CreateDirectoryError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove replica entry {}", path.best_effort_path_display()))]
    RemoveFileError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to copy a file into the replica"))]
    TransferError { source: CopyError },
    #[snafu(display("Failed to compare file contents"))]
    CompareError { source: DigestError },
    #[snafu(display("Failed to record the change to {}", path.best_effort_path_display()))]
    SinkError { path: PathBuf, source: io::Error },
}
