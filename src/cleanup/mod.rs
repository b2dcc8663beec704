// ABOUTME: Pattern-driven removal of stale, non-artifact files from a deployment directory.
// ABOUTME: Validation gate, preview, and removal behind the Cleaner trait.

mod engine;
pub mod patterns;

pub use engine::CleanupEngine;
pub use patterns::{default_cleanup_patterns, default_preserve_patterns, matches_pattern};

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Cleanup errors that abort before anything is touched.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cleanup pattern '{pattern}' would remove critical site files")]
    CriticalPattern { pattern: String },

    #[error("cleanup directory does not exist: {}", .0.display())]
    WorkDirMissing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A path that could not be removed. Collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Summary of one cleanup run. Paths are relative to the cleaned directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub files_preserved: usize,
    pub dirs_preserved: usize,
    pub removed: Vec<String>,
    pub preserved: Vec<String>,
    pub errors: Vec<PathError>,
    pub dry_run: bool,
}

impl CleanupResult {
    pub fn removed_count(&self) -> usize {
        self.files_removed + self.dirs_removed
    }
}

/// One cleanup invocation: where, what to remove, what to keep.
///
/// `protect` is added to the engine's own preserve patterns for this call
/// only; the deploy path passes the artifacts it just wrote.
#[derive(Debug, Clone, Copy)]
pub struct CleanupRequest<'a> {
    pub dir: &'a Path,
    pub patterns: &'a [String],
    pub protect: &'a [String],
}

impl<'a> CleanupRequest<'a> {
    pub fn new(dir: &'a Path, patterns: &'a [String]) -> Self {
        Self {
            dir,
            patterns,
            protect: &[],
        }
    }

    pub fn protecting(mut self, protect: &'a [String]) -> Self {
        self.protect = protect;
        self
    }
}

/// Removal of stale files from a deployment directory.
pub trait Cleaner: Send + Sync {
    /// Reject critical patterns and a missing directory before any mutation.
    fn validate(&self, dir: &Path, patterns: &[String]) -> Result<(), CleanupError>;

    /// Paths that [`Cleaner::cleanup`] would remove, without touching disk.
    fn preview(&self, request: CleanupRequest<'_>) -> Result<Vec<String>, CleanupError>;

    /// Remove matching paths (or only count them when `dry_run`).
    fn cleanup(
        &self,
        request: CleanupRequest<'_>,
        dry_run: bool,
    ) -> Result<CleanupResult, CleanupError>;
}

/// Reject any pattern on the critical list.
pub fn validate_patterns(patterns: &[String]) -> Result<(), CleanupError> {
    match patterns.iter().find(|p| patterns::is_critical_pattern(p)) {
        Some(pattern) => Err(CleanupError::CriticalPattern {
            pattern: pattern.trim().to_string(),
        }),
        None => Ok(()),
    }
}
