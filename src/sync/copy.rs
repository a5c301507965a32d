use std::io;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::File;
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use snafu::{ResultExt, Snafu};

use crate::compare::CHUNK_SIZE;
use crate::ext::BestEffortPathExt;

/// Streams `from` into `to`, creating or truncating `to`. Returns the bytes copied.
///
/// The source is opened before the target is touched, so a vanished source
/// leaves the replica as it was.
pub async fn copy_file(from: &Path, to: &Path) -> Result<u64, CopyError> {
    let source = File::open(from).await.context(OpenSourceSnafu { path: from })?;
    let mut target = File::create(to).await.context(CreateTargetSnafu { path: to })?;

    let mut buffer = Vec::with_capacity(CHUNK_SIZE);
    let mut position = 0u64;
    loop {
        buffer.clear();
        let BufResult(read, returned) = source.read_at(buffer, position).await;
        buffer = returned;
        let read = read.context(ReadSourceSnafu { path: from })?;
        if read == 0 {
            break;
        }

        let BufResult(written, returned) = target.write_all_at(buffer, position).await;
        buffer = returned;
        written.context(WriteTargetSnafu { path: to })?;
        position += read as u64;
    }

    Ok(position)
}

#[derive(Debug, Snafu)]
pub enum CopyError {
    #[snafu(display("Failed to open source file {}", path.best_effort_path_display()))]
    OpenSourceError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to create replica file {}", path.best_effort_path_display()))]
    CreateTargetError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to read source file {}", path.best_effort_path_display()))]
    ReadSourceError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to write replica file {}", path.best_effort_path_display()))]
    WriteTargetError { path: PathBuf, source: io::Error },
}

impl CopyError {
    /// The source disappeared before it could be opened.
    pub fn is_source_vanished(&self) -> bool {
        matches!(self, CopyError::OpenSourceError { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
