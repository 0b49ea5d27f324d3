//! Run configuration.
//!
//! Two layers feed a run:
//!
//! 1. An optional settings file (`--config PATH`, TOML). Stock defaults are
//!    overridden by whatever keys the file sets.
//! 2. Command-line flags, which take precedence over the file.
//!
//! The result is validated once into an immutable [`RunConfig`] that is passed
//! by reference to every walker. Nothing is read from process-wide state after
//! that point.
//!
//! ## Settings File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! sizes = ["1600x1200"]     # Used when no --add-target-size is given
//! subdirectories = []       # Used when no --add-subdirectory is given
//! quality = 90              # JPEG encoding quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Target Sizes
//!
//! A target size is written `WIDTHxHEIGHT[:SUBDIR]`. Without `SUBDIR` the
//! mirror lives in a directory named after the size itself:
//!
//! ```text
//! 1600x1200            → 1600×1200 box, mirror in target/1600x1200/
//! 800x600:thumb        → 800×600 box,   mirror in target/thumb/
//! 2048x2048:web/large  → 2048×2048 box, mirror in target/web/large/
//! ```

use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Size used when neither the command line nor the settings file names one.
pub const DEFAULT_TARGET_SIZE: &str = "1600x1200";

/// Scope entry replaced by the current four-digit year.
pub const YEAR_PLACEHOLDER: &str = "-YEAR-";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{flag} is not a valid directory: {path}")]
    NotADirectory { flag: &'static str, path: PathBuf },
    #[error("--directory-target can not be a directory inside --directory-source")]
    TargetInsideSource,
    #[error("--add-target-size argument {input} is not a valid target size: {reason}")]
    InvalidTargetSize {
        input: String,
        reason: TargetSizeError,
    },
    #[error("mirror of target size {0} overlaps --directory-source")]
    MirrorOverlapsSource(String),
    #[error("target sizes {0} and {1} share an output subdirectory")]
    OverlappingSubdirectories(String, String),
    #[error("--add-subdirectory argument {0} must be a relative path inside the source")]
    InvalidScope(String),
}

// =============================================================================
// Target sizes
// =============================================================================

/// Why a `WIDTHxHEIGHT[:SUBDIR]` string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetSizeError {
    #[error("expected WIDTHxHEIGHT")]
    MissingSeparator,
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("width and height must be greater than zero")]
    Zero,
    #[error("output subdirectory is empty")]
    EmptySubdirectory,
    #[error("output subdirectory {0:?} must be a relative path without '..'")]
    InvalidSubdirectory(String),
}

/// One mirror: a bounding box and the directory under the target root that
/// holds its copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
    pub subdirectory: PathBuf,
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}:{}",
            self.width,
            self.height,
            self.subdirectory.display()
        )
    }
}

impl FromStr for TargetSize {
    type Err = TargetSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, subdirectory) = s.split_once(':').unwrap_or((s, s));
        if subdirectory.is_empty() {
            return Err(TargetSizeError::EmptySubdirectory);
        }

        let (width, height) = size
            .split_once('x')
            .ok_or(TargetSizeError::MissingSeparator)?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| TargetSizeError::NotANumber(v.to_string()))
        };
        let (width, height) = (parse(width)?, parse(height)?);
        if width == 0 || height == 0 {
            return Err(TargetSizeError::Zero);
        }

        // A second colon is a typo, not part of a directory name
        if subdirectory.contains(':') {
            return Err(TargetSizeError::InvalidSubdirectory(subdirectory.to_string()));
        }
        let subdirectory = PathBuf::from(subdirectory);
        if !is_plain_relative(&subdirectory) {
            return Err(TargetSizeError::InvalidSubdirectory(
                subdirectory.display().to_string(),
            ));
        }

        Ok(Self {
            width,
            height,
            subdirectory,
        })
    }
}

/// Parse one `--add-target-size` value into a [`ConfigError`]-flavored result.
pub fn parse_target_size(input: &str) -> Result<TargetSize, ConfigError> {
    input
        .parse()
        .map_err(|reason| ConfigError::InvalidTargetSize {
            input: input.to_string(),
            reason,
        })
}

/// Non-empty, relative, and made only of normal components (no `.`, `..`,
/// root or prefix).
fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

// =============================================================================
// Scope
// =============================================================================

/// Replace every literal `-YEAR-` entry with `year`.
///
/// Only whole entries match; `2024/-YEAR-` is left untouched.
pub fn expand_year_placeholder(entries: &[String], year: i32) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            if entry == YEAR_PLACEHOLDER {
                format!("{year:04}")
            } else {
                entry.clone()
            }
        })
        .collect()
}

// =============================================================================
// Run configuration
// =============================================================================

/// Validated, immutable configuration for one synchronization run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Canonical source root (originals).
    pub source_root: PathBuf,
    /// Canonical target root (holds one directory per size).
    pub target_root: PathBuf,
    /// Mirrors to maintain, in processing order.
    pub sizes: Vec<TargetSize>,
    /// Relative subdirectories to restrict the walk to. Empty = whole tree.
    pub scope: Vec<PathBuf>,
    /// Report prunable paths instead of removing them.
    pub dry_run: bool,
    pub quality: Quality,
}

/// Unvalidated inputs for [`RunConfig::new`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub source: PathBuf,
    pub target: PathBuf,
    pub sizes: Vec<TargetSize>,
    pub scope: Vec<String>,
    pub dry_run: bool,
    pub quality: u32,
}

impl RunConfig {
    /// Resolve and validate the run inputs.
    ///
    /// Both roots must be existing directories; they are canonicalized so the
    /// nesting check cannot be fooled by symlinks or `..`. The check is
    /// per path component: `/photos-web` is not inside `/photos`. The same
    /// check applies to every mirror root, since a size subdirectory can lead
    /// back into the source when the target is one of its ancestors.
    pub fn new(options: RunOptions) -> Result<Self, ConfigError> {
        let source_root = resolve_dir(&options.source, "--directory-source")?;
        let target_root = resolve_dir(&options.target, "--directory-target")?;
        if target_root.starts_with(&source_root) {
            return Err(ConfigError::TargetInsideSource);
        }

        let sizes = if options.sizes.is_empty() {
            vec![parse_target_size(DEFAULT_TARGET_SIZE)?]
        } else {
            options.sizes
        };
        for (i, a) in sizes.iter().enumerate() {
            for b in &sizes[i + 1..] {
                if a.subdirectory.starts_with(&b.subdirectory)
                    || b.subdirectory.starts_with(&a.subdirectory)
                {
                    return Err(ConfigError::OverlappingSubdirectories(
                        a.to_string(),
                        b.to_string(),
                    ));
                }
            }
        }
        // Pruning deletes whatever in a mirror has no original, so a mirror
        // must neither sit inside the source nor contain it.
        for size in &sizes {
            let mirror = target_root.join(&size.subdirectory);
            let mirror = fs::canonicalize(&mirror).unwrap_or(mirror);
            if mirror.starts_with(&source_root) || source_root.starts_with(&mirror) {
                return Err(ConfigError::MirrorOverlapsSource(size.to_string()));
            }
        }

        let mut scope: Vec<PathBuf> = Vec::new();
        for entry in &options.scope {
            let path = PathBuf::from(entry);
            if !is_plain_relative(&path) {
                return Err(ConfigError::InvalidScope(entry.clone()));
            }
            if !scope.contains(&path) {
                scope.push(path);
            }
        }

        Ok(Self {
            source_root,
            target_root,
            sizes,
            scope,
            dry_run: options.dry_run,
            quality: Quality::new(options.quality),
        })
    }

    /// Root of the mirror for one size: `target_root/size.subdirectory`.
    pub fn mirror_root(&self, size: &TargetSize) -> PathBuf {
        self.target_root.join(&size.subdirectory)
    }

    /// Relative roots to walk: each scope entry, or the whole tree (empty
    /// path) when unscoped.
    pub fn scope_roots(&self) -> Vec<PathBuf> {
        if self.scope.is_empty() {
            vec![PathBuf::new()]
        } else {
            self.scope.clone()
        }
    }
}

fn resolve_dir(path: &Path, flag: &'static str) -> Result<PathBuf, ConfigError> {
    let not_a_dir = || ConfigError::NotADirectory {
        flag,
        path: path.to_path_buf(),
    };
    let resolved = fs::canonicalize(path).map_err(|_| not_a_dir())?;
    if resolved.is_dir() {
        Ok(resolved)
    } else {
        Err(not_a_dir())
    }
}

// =============================================================================
// Settings file
// =============================================================================

/// Settings loaded from the optional TOML file.
///
/// All fields have defaults; a file need only specify what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Target sizes, in `WIDTHxHEIGHT[:SUBDIR]` form.
    pub sizes: Vec<String>,
    /// Scope entries; `-YEAR-` is expanded like on the command line.
    pub subdirectories: Vec<String>,
    /// JPEG encoding quality (1-100).
    pub quality: u32,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sizes: vec![DEFAULT_TARGET_SIZE.to_string()],
            subdirectories: Vec::new(),
            quality: 90,
            processing: ProcessingConfig::default(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.sizes.is_empty() {
            return Err(ConfigError::Validation("sizes must not be empty".into()));
        }
        for size in &self.sizes {
            parse_target_size(size)?;
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parsed target sizes. Only valid after [`Settings::validate`].
    pub fn target_sizes(&self) -> Result<Vec<TargetSize>, ConfigError> {
        self.sizes.iter().map(|s| parse_target_size(s)).collect()
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default settings as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).expect("default settings must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, arrays included.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings, merging the file (if any) over stock defaults.
///
/// `None` yields the validated defaults. A named file that is missing is an
/// error, unlike an absent `--config` flag.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let base = stock_defaults_value();
    let merged = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let overlay: toml::Value = toml::from_str(&content)?;
            merge_toml(base, overlay)
        }
        None => base,
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}
