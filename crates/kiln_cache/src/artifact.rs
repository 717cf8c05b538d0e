//! Content-addressed binary artifact storage.
//!
//! Compiled declaration artifacts are stored as framed binary files under
//! `<cache>/artifacts/`. The key of an artifact is the content hash of its
//! bytes, so writing the same artifact twice is a no-op and an intact
//! artifact file never changes once written. That is what lets the cache write
//! artifacts during a round without disturbing the committed generation:
//! files nobody references are collected after the next commit.

use std::path::{Path, PathBuf};

use kiln_common::ContentHash;

use crate::error::CacheError;
use crate::frame::{decode_frame, encode_frame};
use crate::fs::remove_file_best_effort;

/// Subdirectory of the cache holding artifacts.
pub const ARTIFACT_SUBDIR: &str = "artifacts";

/// File extension for artifacts.
pub const ARTIFACT_EXT: &str = "art";

/// Content-addressed store for declaration artifacts.
pub struct ArtifactStore {
    /// Directory holding the artifact files.
    dir: PathBuf,

    /// Tool version recorded in artifact headers.
    tool_version: String,
}

impl ArtifactStore {
    /// Creates a store rooted at `<cache_dir>/artifacts`.
    pub fn new(cache_dir: &Path, tool_version: &str) -> Self {
        Self {
            dir: cache_dir.join(ARTIFACT_SUBDIR),
            tool_version: tool_version.to_string(),
        }
    }

    /// Returns the file path for an artifact with the given key.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ARTIFACT_EXT}"))
    }

    /// Writes an artifact and returns its key.
    ///
    /// An artifact already present under the same key is left in place if
    /// it still decodes to `data`; a damaged one is replaced.
    pub fn write_artifact(&self, data: &[u8]) -> Result<String, CacheError> {
        let key = ContentHash::from_bytes(data).to_string();
        let path = self.artifact_path(&key);
        if path.is_file() {
            match self.read_artifact(&key) {
                Ok(stored) if stored == data => return Ok(key),
                Ok(_) => tracing::debug!(path = %path.display(), "replacing mismatched artifact"),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "replacing damaged artifact")
                }
            }
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        let framed = encode_frame(data, &self.tool_version)?;
        crate::fs::atomic_write(&path, &framed)?;
        Ok(key)
    }

    /// Reads and validates the artifact stored under `key`.
    pub fn read_artifact(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.artifact_path(key);
        let raw = std::fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
        let payload = decode_frame(&path, &raw)?;
        Ok(payload.to_vec())
    }

    /// Removes artifacts whose key is not in `live_keys`.
    ///
    /// Returns the number of files removed.
    pub fn gc<'a>(
        &self,
        live_keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<usize, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let live: std::collections::HashSet<&str> = live_keys.into_iter().collect();

        let mut removed = 0;
        let entries = std::fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !live.contains(stem) && remove_file_best_effort(&path, "artifact_gc") {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}
