//! Generation pass: source tree → mirrors.
//!
//! Walks a source root in pre-order (entries sorted by name) and, for every
//! JPEG or PNG found, brings each configured mirror's copy up to date:
//!
//! ```text
//! originals/2024/trip/a.jpg
//!   ├── 1600x1200 → copies/1600x1200/2024/trip/a.jpg   (stale → transform)
//!   └── thumb     → copies/thumb/2024/trip/a.jpg       (fresh → skip)
//! ```
//!
//! The walk itself is sequential; the per-file work (classification and
//! fan-out over sizes) runs on the rayon pool. Units share nothing but the
//! filesystem, and target directories are created with `create_dir_all`, which
//! tolerates concurrent creators.
//!
//! Per-file problems never abort the pass. Files that are not images are
//! skipped silently; failed transforms are reported and counted.

use crate::config::{RunConfig, TargetSize};
use crate::imaging::{ImageBackend, TransformParams};
use crate::staleness::is_stale;
use crate::sync::{SyncEvent, emit};
use rayon::prelude::*;
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counters for one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Targets written.
    pub generated: u32,
    /// Targets skipped because they were already fresh.
    pub up_to_date: u32,
    /// Transforms (or target directory creations) that failed.
    pub failed: u32,
    /// Directory entries the walk could not read.
    pub walk_errors: u32,
}

impl AddAssign for GenerateStats {
    fn add_assign(&mut self, other: Self) {
        self.generated += other.generated;
        self.up_to_date += other.up_to_date;
        self.failed += other.failed;
        self.walk_errors += other.walk_errors;
    }
}

/// Run the generation pass over `root`, which is the source root or one
/// scoped subdirectory of it. A missing root is a no-op.
pub fn generate(
    backend: &impl ImageBackend,
    config: &RunConfig,
    root: &Path,
    events: Option<&Sender<SyncEvent>>,
) -> GenerateStats {
    let mut stats = GenerateStats::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "source root missing, nothing to generate");
        return stats;
    }

    let candidates = collect_files(root, events, &mut stats);

    let per_file = candidates
        .par_iter()
        .map(|source| generate_file(backend, config, source, events))
        .reduce(GenerateStats::default, |mut a, b| {
            a += b;
            a
        });
    stats += per_file;
    stats
}

/// Regular files under `root` in walk order. Directories, symlinks to
/// directories and special files are left out.
fn collect_files(
    root: &Path,
    events: Option<&Sender<SyncEvent>>,
    stats: &mut GenerateStats,
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable source entry");
                stats.walk_errors += 1;
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
        if entry.file_type().is_dir() {
            continue;
        }
        // Follows symlinks to files; rejects FIFOs, sockets and dangling links
        if entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    files
}

/// Bring every mirror's copy of one source file up to date.
fn generate_file(
    backend: &impl ImageBackend,
    config: &RunConfig,
    source: &Path,
    events: Option<&Sender<SyncEvent>>,
) -> GenerateStats {
    let mut stats = GenerateStats::default();

    let kind = backend.classify(source);
    if !kind.is_supported() {
        debug!(path = %source.display(), ?kind, "not a mirrored image");
        return stats;
    }

    let Ok(relative) = source.strip_prefix(&config.source_root) else {
        warn!(path = %source.display(), "source file outside source root");
        return stats;
    };

    for size in &config.sizes {
        let target = target_path(config, size, relative);
        if !is_stale(source, &target) {
            stats.up_to_date += 1;
            continue;
        }
        match generate_target(backend, config, size, source, &target) {
            Ok(event) => {
                stats.generated += 1;
                emit(events, event);
            }
            Err(event) => {
                stats.failed += 1;
                emit(events, event);
            }
        }
    }
    stats
}

/// `target_root/size.subdirectory/relative`.
pub fn target_path(config: &RunConfig, size: &TargetSize, relative: &Path) -> PathBuf {
    config.mirror_root(size).join(relative)
}

fn generate_target(
    backend: &impl ImageBackend,
    config: &RunConfig,
    size: &TargetSize,
    source: &Path,
    target: &Path,
) -> Result<SyncEvent, SyncEvent> {
    let failed = |error: String| {
        warn!(source = %source.display(), size = %size, %error, "transform failed");
        SyncEvent::TransformFailed {
            source: source.to_path_buf(),
            size: size.to_string(),
            error,
        }
    };

    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).map_err(|e| failed(e.to_string()))?;
    }

    let params = TransformParams {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        max_width: size.width,
        max_height: size.height,
        quality: config.quality,
    };
    let dims = backend
        .transform(&params)
        .map_err(|e| failed(e.to_string()))?;

    debug!(target = %target.display(), width = dims.width, height = dims.height, "generated");
    Ok(SyncEvent::Generated {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        width: dims.width,
        height: dims.height,
    })
}
