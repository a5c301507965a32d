use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::File;
use compio::io::AsyncReadAt;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::{AsyncTryFrom, AsyncTryInto, BestEffortPathExt};

/// Size of the buffer used when streaming file contents.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's full byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl AsyncTryFrom<&Path> for ContentDigest {
    type Error = DigestError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let file = File::open(path).await.context(OpenSnafu { path })?;

        let mut hasher = Sha256::new();
        let mut buffer = Vec::with_capacity(CHUNK_SIZE);
        let mut position = 0u64;
        loop {
            buffer.clear();
            let BufResult(read, returned) = file.read_at(buffer, position).await;
            buffer = returned;
            let read = read.context(ReadSnafu { path })?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            position += read as u64;
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

/// Returns whether both files hold exactly the same bytes.
///
/// Files are read one after the other, so at most one handle is open at a time.
pub async fn files_equal(first: &Path, second: &Path) -> Result<bool, DigestError> {
    let first_digest: ContentDigest = first.async_try_into().await?;
    let second_digest: ContentDigest = second.async_try_into().await?;
    debug!(
        "Digests {} ({}) and {} ({})",
        first.display(),
        first_digest,
        second.display(),
        second_digest
    );
    Ok(first_digest == second_digest)
}

#[derive(Debug, Snafu)]
pub enum DigestError {
    #[snafu(display("Failed to open {} for hashing", path.best_effort_path_display()))]
    OpenError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to read {} while hashing", path.best_effort_path_display()))]
    ReadError { path: PathBuf, source: io::Error },
}

impl DigestError {
    pub fn path(&self) -> &Path {
        match self {
            DigestError::OpenError { path, .. } | DigestError::ReadError { path, .. } => path,
        }
    }

    pub fn io_error(&self) -> &io::Error {
        match self {
            DigestError::OpenError { source, .. } | DigestError::ReadError { source, .. } => source,
        }
    }
}
