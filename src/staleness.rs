//! Up-to-date check for mirror artifacts.
//!
//! There is no index: whether a target needs regenerating is derived from
//! filesystem timestamps on every run. A target is stale when it is missing
//! or strictly older than its source. Equal timestamps count as up to date.
//!
//! A source edit that does not advance its mtime goes unnoticed. That is an
//! accepted limitation of timestamp comparison.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Pure decision rule behind [`is_stale`].
pub fn needs_update(source_mtime: SystemTime, target_mtime: Option<SystemTime>) -> bool {
    match target_mtime {
        None => true,
        Some(target) => source_mtime > target,
    }
}

/// Whether `target` must be (re)generated from `source`.
///
/// Unreadable timestamps count as stale: the transform that follows reports
/// the underlying problem.
pub fn is_stale(source: &Path, target: &Path) -> bool {
    let target_mtime = match fs::metadata(target) {
        Ok(meta) => match meta.modified() {
            Ok(t) => Some(t),
            Err(_) => return true,
        },
        Err(_) => None,
    };
    match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(source_mtime) => needs_update(source_mtime, target_mtime),
        Err(_) => true,
    }
}
