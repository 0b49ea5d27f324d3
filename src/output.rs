//! CLI output formatting for sync runs.
//!
//! # Output Format
//!
//! ```text
//! ==> Generating /photos/originals
//! /photos/originals/2024/a.jpg → /photos/copies/thumb/2024/a.jpg (800x640)
//! /photos/originals/2024/broken.jpg
//!     800x600:thumb: Processing failed: Failed to decode: ...
//! ==> Pruning /photos/copies/thumb
//! removed file /photos/copies/thumb/2019/old.jpg
//! removed directory /photos/copies/thumb/2019
//!
//! 1 generated, 37 up to date, 1 failed; removed 1 files, 1 directories
//! ```
//!
//! With `--no-delete`, prune lines read `would remove file <path>` and
//! `would remove directory <path>` and nothing is touched.
//!
//! A failed transform leads with the bare source path so the line can be
//! copied straight into another command; the reason follows indented.
//!
//! # Architecture
//!
//! Each kind of output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::sync::{Phase, SyncEvent, SyncSummary};

/// Format a single sync event as display lines.
pub fn format_sync_event(event: &SyncEvent) -> Vec<String> {
    match event {
        SyncEvent::PhaseStarted { phase, root } => {
            let verb = match phase {
                Phase::Generate => "Generating",
                Phase::Prune => "Pruning",
            };
            vec![format!("==> {} {}", verb, root.display())]
        }
        SyncEvent::Generated {
            source,
            target,
            width,
            height,
        } => vec![format!(
            "{} → {} ({}x{})",
            source.display(),
            target.display(),
            width,
            height
        )],
        SyncEvent::TransformFailed {
            source,
            size,
            error,
        } => vec![
            source.display().to_string(),
            format!("    {}: {}", size, error),
        ],
        SyncEvent::WalkFailed { path, error } => match path {
            Some(path) => vec![format!("unreadable {}: {}", path.display(), error)],
            None => vec![format!("unreadable entry: {}", error)],
        },
        SyncEvent::Removed { path, kind } => {
            vec![format!("removed {} {}", kind, path.display())]
        }
        SyncEvent::WouldRemove { path, kind } => {
            vec![format!("would remove {} {}", kind, path.display())]
        }
        SyncEvent::PruneFailed { path, error } => {
            vec![format!("could not remove {}: {}", path.display(), error)]
        }
    }
}

pub fn print_sync_event(event: &SyncEvent) {
    for line in format_sync_event(event) {
        println!("{}", line);
    }
}

/// Closing block: a blank separator line, then the one-line totals.
pub fn format_summary(summary: &SyncSummary) -> Vec<String> {
    let mut lines = vec![String::new(), summary.to_string()];
    if summary.has_failures() {
        lines.push("Some entries could not be processed; see the messages above.".to_string());
    }
    lines
}

pub fn print_summary(summary: &SyncSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerateStats;
    use crate::prune::PruneStats;
    use crate::sync::EntryKind;
    use std::path::PathBuf;

    #[test]
    fn format_phase_lines() {
        let generate = SyncEvent::PhaseStarted {
            phase: Phase::Generate,
            root: PathBuf::from("/photos/originals"),
        };
        let prune = SyncEvent::PhaseStarted {
            phase: Phase::Prune,
            root: PathBuf::from("/photos/copies/thumb"),
        };
        assert_eq!(
            format_sync_event(&generate),
            vec!["==> Generating /photos/originals"]
        );
        assert_eq!(
            format_sync_event(&prune),
            vec!["==> Pruning /photos/copies/thumb"]
        );
    }

    #[test]
    fn format_generated() {
        let event = SyncEvent::Generated {
            source: PathBuf::from("/o/a.jpg"),
            target: PathBuf::from("/c/thumb/a.jpg"),
            width: 750,
            height: 600,
        };
        assert_eq!(
            format_sync_event(&event),
            vec!["/o/a.jpg → /c/thumb/a.jpg (750x600)"]
        );
    }

    #[test]
    fn format_transform_failure_leads_with_source_path() {
        let event = SyncEvent::TransformFailed {
            source: PathBuf::from("/o/broken.jpg"),
            size: "800x600:thumb".to_string(),
            error: "Processing failed: bad marker".to_string(),
        };
        let lines = format_sync_event(&event);
        assert_eq!(lines[0], "/o/broken.jpg");
        assert_eq!(lines[1], "    800x600:thumb: Processing failed: bad marker");
    }

    #[test]
    fn format_dry_run_lines() {
        let file = SyncEvent::WouldRemove {
            path: PathBuf::from("/c/thumb/a.jpg"),
            kind: EntryKind::File,
        };
        let dir = SyncEvent::WouldRemove {
            path: PathBuf::from("/c/thumb/old"),
            kind: EntryKind::Directory,
        };
        assert_eq!(
            format_sync_event(&file),
            vec!["would remove file /c/thumb/a.jpg"]
        );
        assert_eq!(
            format_sync_event(&dir),
            vec!["would remove directory /c/thumb/old"]
        );
    }

    #[test]
    fn format_removed() {
        let event = SyncEvent::Removed {
            path: PathBuf::from("/c/thumb/2019"),
            kind: EntryKind::Directory,
        };
        assert_eq!(
            format_sync_event(&event),
            vec!["removed directory /c/thumb/2019"]
        );
    }

    #[test]
    fn format_prune_failure() {
        let event = SyncEvent::PruneFailed {
            path: PathBuf::from("/c/thumb/a.jpg"),
            error: "Permission denied (os error 13)".to_string(),
        };
        assert_eq!(
            format_sync_event(&event),
            vec!["could not remove /c/thumb/a.jpg: Permission denied (os error 13)"]
        );
    }

    #[test]
    fn format_walk_failure_with_and_without_path() {
        let with_path = SyncEvent::WalkFailed {
            path: Some(PathBuf::from("/o/locked")),
            error: "denied".to_string(),
        };
        let without = SyncEvent::WalkFailed {
            path: None,
            error: "loop".to_string(),
        };
        assert_eq!(
            format_sync_event(&with_path),
            vec!["unreadable /o/locked: denied"]
        );
        assert_eq!(format_sync_event(&without), vec!["unreadable entry: loop"]);
    }

    #[test]
    fn format_summary_block() {
        let summary = SyncSummary {
            generate: GenerateStats {
                generated: 2,
                up_to_date: 0,
                failed: 0,
                walk_errors: 0,
            },
            prune: PruneStats::default(),
            dry_run: false,
        };
        assert_eq!(
            format_summary(&summary),
            vec![
                "".to_string(),
                "2 generated, 0 up to date, 0 failed; removed 0 files, 0 directories".to_string(),
            ]
        );
    }

    #[test]
    fn format_summary_points_at_failures() {
        let summary = SyncSummary {
            generate: GenerateStats {
                generated: 1,
                up_to_date: 0,
                failed: 1,
                walk_errors: 0,
            },
            prune: PruneStats::default(),
            dry_run: false,
        };
        let lines = format_summary(&summary);
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "1 generated, 0 up to date, 1 failed; removed 0 files, 0 directories"
        );
        assert_eq!(
            lines[2],
            "Some entries could not be processed; see the messages above."
        );
    }
}
