use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// Immediate children of one directory, keyed by base name.
///
/// Taken once per level; reconciliation of that level works only against
/// this listing. `foreign` holds entries that are neither directories nor
/// regular files (symbolic links included, never followed).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LevelSnapshot {
    pub directories: BTreeSet<OsString>,
    pub files: BTreeSet<OsString>,
    pub foreign: BTreeSet<OsString>,
}

impl LevelSnapshot {
    pub fn read(directory: &Path) -> io::Result<Self> {
        let mut snapshot = Self::default();

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!("{} vanished while listing", entry.path().display());
                    continue;
                }
                Err(err) => return Err(err),
            };

            let name = entry.file_name();
            if file_type.is_dir() {
                snapshot.directories.insert(name);
            } else if file_type.is_file() {
                snapshot.files.insert(name);
            } else {
                debug!("Not a regular file or directory: {}", entry.path().display());
                snapshot.foreign.insert(name);
            }
        }

        debug!(
            "Listed {}: {} directories, {} files, {} other entries",
            directory.display(),
            snapshot.directories.len(),
            snapshot.files.len(),
            snapshot.foreign.len()
        );
        Ok(snapshot)
    }

    /// Takes `name` out of the non-directory sets, returning whether it was there.
    pub fn take_non_directory(&mut self, name: &OsString) -> bool {
        self.files.remove(name) | self.foreign.remove(name)
    }
}
