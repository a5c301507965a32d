//! One-way mirroring of a source tree into a replica tree.
//!
//! A pass walks both trees depth-first in lockstep. At every level it removes
//! replica subdirectories the source no longer has, creates the ones it
//! lacks, recurses, and then reconciles the level's files by name and content.

mod change_event;
mod copy;
mod level_snapshot;
mod synchronizer;

pub use change_event::{ChangeEvent, ChangeKind};
pub use copy::{CopyError, copy_file};
pub use level_snapshot::LevelSnapshot;
pub use synchronizer::{SyncError, synchronize_tree, synchronize_tree_collect};
