//! Build history: the snapshot of the last successful build plus a bounded
//! log of recent public API diffs.
//!
//! The history is stored as `history.json` inside each cache generation.
//! The snapshot answers "what did the last build see?" for this module;
//! the diffs answer "what did this module's builds change?" for modules
//! that consume its outputs on their classpath.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::changes::DirtyData;
use crate::error::CacheError;
use crate::hasher::LibraryFingerprint;
use crate::layout::CacheLayout;

/// Name of the history file within a generation directory.
pub const HISTORY_FILE: &str = "history.json";

/// Persisted summary of the previous successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    /// Tool version that produced the build.
    pub tool_version: String,
    /// Monotonic version marker; equals the committed cache generation.
    pub version: u64,
    /// Build start time, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    /// Classpath fingerprints the build compiled against.
    pub classpath: Vec<LibraryFingerprint>,
}

/// Public API changes made by one successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiff {
    /// Build start time, milliseconds since the Unix epoch.
    pub ts: u64,
    /// `false` for full rebuilds, whose changes are not tracked.
    pub is_incremental: bool,
    /// Public symbols and names the build changed.
    pub dirty: DirtyData,
}

/// Contents of `history.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHistory {
    /// The last successful build, if any.
    pub snapshot: Option<BuildSnapshot>,
    /// Recent build diffs, oldest first.
    pub diffs: Vec<BuildDiff>,
}

impl BuildHistory {
    /// Loads the history from a generation directory.
    pub fn load(generation_dir: &Path) -> Result<Self, CacheError> {
        let path = generation_dir.join(HISTORY_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| CacheError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| CacheError::HistoryParse {
            path,
            reason: e.to_string(),
        })
    }

    /// Loads the committed history of the cache at `cache_dir`.
    ///
    /// Returns `Ok(None)` if nothing was ever committed there.
    pub fn load_committed(cache_dir: &Path) -> Result<Option<Self>, CacheError> {
        let layout = CacheLayout::new(cache_dir);
        match layout.current_generation()? {
            Some(generation) => Self::load(&layout.generation_dir(generation)).map(Some),
            None => Ok(None),
        }
    }

    /// Writes the history into a generation directory.
    pub fn save(&self, generation_dir: &Path) -> Result<(), CacheError> {
        let path = generation_dir.join(HISTORY_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        crate::fs::atomic_write(&path, json.as_bytes())
    }

    /// Appends `diff`, keeping only the `keep` most recent entries.
    pub fn push_diff(&mut self, diff: BuildDiff, keep: usize) {
        self.diffs.push(diff);
        if self.diffs.len() > keep {
            let excess = self.diffs.len() - keep;
            self.diffs.drain(..excess);
        }
    }
}
