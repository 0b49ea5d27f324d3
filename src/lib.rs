//! # Photo Mirror
//!
//! Keeps one or more resized "mirror" trees of a photo collection in sync with
//! the originals. Every JPEG and PNG under the source root gets a copy, fit
//! within a bounding box, at the same relative path under each mirror. Copies
//! are regenerated when the original changes and removed when it goes away.
//!
//! ```text
//! originals/                       copies/
//! ├── 2024/                        ├── 1600x1200/          (default size)
//! │   ├── a.jpg          ──────►   │   └── 2024/a.jpg, b.png
//! │   └── b.png                    └── thumb/              (800x600:thumb)
//! └── notes.txt   (ignored)            └── 2024/a.jpg, b.png
//! ```
//!
//! # Architecture: Two Passes per Run
//!
//! ```text
//! 1. Generate   source tree  →  every mirror   (pre-order, parallel per file)
//! 2. Prune      each mirror  →  source tree    (post-order, cascading deletes)
//! ```
//!
//! There is no index or manifest. Whether a copy is up to date is re-derived
//! from file timestamps on every run, and the mapping between an original and
//! its copies is pure path arithmetic. Running twice in a row does nothing the
//! second time.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sync`] | Run coordinator: scopes, pass ordering, progress events, summary |
//! | [`generate`] | Generation pass: walks originals, fans out over sizes, transforms stale copies |
//! | [`prune`] | Pruning pass: removes orphaned copies and emptied directories, or reports them |
//! | [`staleness`] | Timestamp rule deciding whether a copy needs regenerating |
//! | [`config`] | Target size parsing, settings file, validated [`config::RunConfig`] |
//! | [`imaging`] | Pure-Rust classify/resize/encode with metadata carry-over |
//! | [`output`] | CLI output formatting for progress events and the summary |
//!
//! # Design Decisions
//!
//! ## Content Sniffing, Not Extensions
//!
//! Files are classified by their leading bytes. A `.JPG` that is really a PNG
//! is mirrored as a PNG; a `.jpg` that is really a text file is ignored. Only
//! JPEG and PNG are mirrored, and each copy keeps its source's format.
//!
//! ## Never Upscale
//!
//! A size is a bounding box. Images already inside it are re-encoded at their
//! own dimensions instead of being enlarged.
//!
//! ## Atomic Writes
//!
//! Copies are encoded into a temporary file next to the target and renamed
//! into place. A failed or interrupted transform leaves either the previous
//! copy or nothing, never a truncated file that looks fresh.
//!
//! ## Dry Run
//!
//! With `--no-delete`, generation still runs but pruning only reports what it
//! would remove, including directories that would become empty as a result.

pub mod config;
pub mod generate;
pub mod imaging;
pub mod output;
pub mod prune;
pub mod staleness;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_helpers;
