//! Inputs of a build attempt.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use kiln_cache::{ReverseIndex, SourceHasher};

/// Source files changed since the previous build.
///
/// Added files count as modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFiles {
    /// Modified or added files.
    pub modified: Vec<PathBuf>,
    /// Deleted files.
    pub removed: Vec<PathBuf>,
}

impl ChangedFiles {
    /// Creates a change notification.
    pub fn new(modified: Vec<PathBuf>, removed: Vec<PathBuf>) -> Self {
        Self { modified, removed }
    }

    /// Derives changes by hashing `sources` and comparing against the
    /// fingerprints recorded in `index`.
    pub fn detect(sources: &[PathBuf], index: &ReverseIndex) -> Self {
        let hashes = SourceHasher::hash_files(sources);
        let changes = SourceHasher::detect_changes(&hashes, index);
        let mut modified = changes.new_files;
        modified.extend(changes.modified_files);
        modified.sort();
        Self {
            modified,
            removed: changes.deleted_files,
        }
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Everything the driver needs for one attempt.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Every source file of the module.
    pub sources: Vec<PathBuf>,
    /// Files changed since the previous build.
    pub changes: ChangedFiles,
    /// The classpath.
    pub libraries: Vec<PathBuf>,
    /// Attempt start time, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
}

impl BuildRequest {
    /// Creates a request stamped with the current time.
    pub fn new(sources: Vec<PathBuf>, changes: ChangedFiles, libraries: Vec<PathBuf>) -> Self {
        Self {
            sources,
            changes,
            libraries,
            started_at_ms: now_ms(),
        }
    }

    /// Overrides the start timestamp.
    pub fn started_at(mut self, ms: u64) -> Self {
        self.started_at_ms = ms;
        self
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
