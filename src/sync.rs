//! Run coordinator.
//!
//! One synchronization run is two passes per scope entry:
//!
//! ```text
//! for each scope root (or the whole tree):
//!     1. generate   source_root/scope          → every mirror
//!     2. prune      target_root/size/scope     ← for each size
//! ```
//!
//! Generation always finishes before pruning starts, so a file that exists in
//! the source is never pruned out from under a transform.
//!
//! Progress is reported as [`SyncEvent`]s over an optional channel. The
//! caller decides how to render them (see [`crate::output`]); the passes
//! themselves never print.

use crate::config::RunConfig;
use crate::generate::{GenerateStats, generate};
use crate::imaging::ImageBackend;
use crate::prune::{PruneStats, prune};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::info;

/// File or directory, for prune reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// Which pass a [`SyncEvent::PhaseStarted`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Generate,
    Prune,
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PhaseStarted {
        phase: Phase,
        root: PathBuf,
    },
    Generated {
        source: PathBuf,
        target: PathBuf,
        width: u32,
        height: u32,
    },
    TransformFailed {
        source: PathBuf,
        /// Target size in `WxH:subdir` form.
        size: String,
        error: String,
    },
    /// A directory entry could not be read during either walk.
    WalkFailed {
        path: Option<PathBuf>,
        error: String,
    },
    Removed {
        path: PathBuf,
        kind: EntryKind,
    },
    /// Dry run: `path` would have been removed.
    WouldRemove {
        path: PathBuf,
        kind: EntryKind,
    },
    PruneFailed {
        path: PathBuf,
        error: String,
    },
}

/// Send an event if anyone is listening. A hung-up receiver is ignored.
pub(crate) fn emit(events: Option<&Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub generate: GenerateStats,
    pub prune: PruneStats,
    pub dry_run: bool,
}

impl SyncSummary {
    /// Whether anything went wrong that the user should look at.
    pub fn has_failures(&self) -> bool {
        self.generate.failed > 0
            || self.generate.walk_errors > 0
            || self.prune.failed > 0
            || self.prune.walk_errors > 0
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.generate;
        let p = &self.prune;
        write!(
            f,
            "{} generated, {} up to date, {} failed",
            g.generated, g.up_to_date, g.failed
        )?;
        if self.dry_run {
            write!(
                f,
                "; would remove {} files, {} directories",
                p.files_removed, p.dirs_removed
            )?;
        } else {
            write!(
                f,
                "; removed {} files, {} directories",
                p.files_removed, p.dirs_removed
            )?;
        }
        if p.failed > 0 {
            write!(f, ", {} removals failed", p.failed)?;
        }
        let walk_errors = g.walk_errors + p.walk_errors;
        if walk_errors > 0 {
            write!(f, ", {} unreadable entries", walk_errors)?;
        }
        Ok(())
    }
}

/// Execute one synchronization run.
///
/// Per-file failures are collected in the returned summary; the run itself
/// never aborts once the configuration has been validated.
pub fn run(
    backend: &impl ImageBackend,
    config: &RunConfig,
    events: Option<&Sender<SyncEvent>>,
) -> SyncSummary {
    let mut summary = SyncSummary {
        dry_run: config.dry_run,
        ..SyncSummary::default()
    };

    for scope in config.scope_roots() {
        let source_root = scoped(&config.source_root, &scope);
        info!(root = %source_root.display(), "generating");
        emit(
            events,
            SyncEvent::PhaseStarted {
                phase: Phase::Generate,
                root: source_root.clone(),
            },
        );
        summary.generate += generate(backend, config, &source_root, events);

        for size in &config.sizes {
            let mirror_root = scoped(&config.mirror_root(size), &scope);
            info!(root = %mirror_root.display(), dry_run = config.dry_run, "pruning");
            emit(
                events,
                SyncEvent::PhaseStarted {
                    phase: Phase::Prune,
                    root: mirror_root.clone(),
                },
            );
            summary.prune += prune(config, size, &mirror_root, events);
        }
    }

    info!(%summary, "run complete");
    summary
}

/// `root/scope`, or `root` itself for the unscoped (empty) entry.
fn scoped(root: &Path, scope: &Path) -> PathBuf {
    if scope.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(scope)
    }
}
