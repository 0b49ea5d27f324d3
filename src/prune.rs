//! Pruning pass: mirror → source.
//!
//! Walks one mirror (or one scoped subtree of it) bottom-up and removes every
//! artifact whose source file is gone, then every directory left empty:
//!
//! ```text
//! copies/thumb/2019/trip/a.jpg   source originals/2019/trip/a.jpg gone → remove
//! copies/thumb/2019/trip/        now empty                            → remove
//! copies/thumb/2019/             now empty                            → remove
//! ```
//!
//! The walk is post-order, so a directory is judged only after all of its
//! contents. A directory counts as empty when every child was removed in this
//! pass. In dry-run mode nothing is touched, but the same bookkeeping runs, so
//! the report shows the full cascade a live run would perform.
//!
//! The mirror root may go too when it ends up empty. The next generation pass
//! recreates it. The target root itself is never removed.

use crate::config::{RunConfig, TargetSize};
use crate::sync::{EntryKind, SyncEvent, emit};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counters for one pruning pass. In dry-run mode the removal counts are
/// what would have been removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub files_removed: u32,
    pub dirs_removed: u32,
    pub failed: u32,
    pub walk_errors: u32,
}

impl AddAssign for PruneStats {
    fn add_assign(&mut self, other: Self) {
        self.files_removed += other.files_removed;
        self.dirs_removed += other.dirs_removed;
        self.failed += other.failed;
        self.walk_errors += other.walk_errors;
    }
}

/// Prune `root`, which is the mirror root for `size` or a scoped directory
/// below it. A missing root is a no-op.
pub fn prune(
    config: &RunConfig,
    size: &TargetSize,
    root: &Path,
    events: Option<&Sender<SyncEvent>>,
) -> PruneStats {
    let mut stats = PruneStats::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "mirror root missing, nothing to prune");
        return stats;
    }

    let mirror_root = config.mirror_root(size);
    // Directories that still hold at least one entry after this pass.
    let mut occupied: HashSet<PathBuf> = HashSet::new();

    for entry in WalkDir::new(root).contents_first(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable mirror entry");
                stats.walk_errors += 1;
                if let Some(path) = err.path() {
                    // Unknown contents: neither the entry nor its parent is empty
                    occupied.insert(path.to_path_buf());
                    keep(&mut occupied, path);
                }
                emit(
                    events,
                    SyncEvent::WalkFailed {
                        path: err.path().map(Path::to_path_buf),
                        error: err.to_string(),
                    },
                );
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            if occupied.contains(path) || path == config.target_root {
                keep(&mut occupied, path);
                continue;
            }
            if remove(config.dry_run, path, EntryKind::Directory, events) {
                stats.dirs_removed += 1;
            } else {
                stats.failed += 1;
                keep(&mut occupied, path);
            }
            continue;
        }

        let Ok(relative) = path.strip_prefix(&mirror_root) else {
            keep(&mut occupied, path);
            continue;
        };
        if config.source_root.join(relative).exists() {
            keep(&mut occupied, path);
            continue;
        }
        if remove(config.dry_run, path, EntryKind::File, events) {
            stats.files_removed += 1;
        } else {
            stats.failed += 1;
            keep(&mut occupied, path);
        }
    }
    stats
}

/// Record that `path` stays, so its parent is not empty.
fn keep(occupied: &mut HashSet<PathBuf>, path: &Path) {
    if let Some(parent) = path.parent() {
        occupied.insert(parent.to_path_buf());
    }
}

/// Remove one entry, or only report it in dry-run mode. Returns whether the
/// entry is (or would be) gone; failures are reported here.
fn remove(
    dry_run: bool,
    path: &Path,
    kind: EntryKind,
    events: Option<&Sender<SyncEvent>>,
) -> bool {
    if dry_run {
        debug!(path = %path.display(), %kind, "would remove");
        emit(
            events,
            SyncEvent::WouldRemove {
                path: path.to_path_buf(),
                kind,
            },
        );
        return true;
    }

    let result: io::Result<()> = match kind {
        EntryKind::File => fs::remove_file(path),
        // remove_dir refuses non-empty directories, so a file written since
        // the walk saw this directory survives
        EntryKind::Directory => fs::remove_dir(path),
    };
    match result {
        Ok(()) => {
            debug!(path = %path.display(), %kind, "removed");
            emit(
                events,
                SyncEvent::Removed {
                    path: path.to_path_buf(),
                    kind,
                },
            );
            true
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "removal failed");
            emit(
                events,
                SyncEvent::PruneFailed {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                },
            );
            false
        }
    }
}
