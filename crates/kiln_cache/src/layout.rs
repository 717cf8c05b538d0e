//! On-disk layout of a cache directory.
//!
//! ```text
//! <cache>/CURRENT                 number of the committed generation
//! <cache>/generations/<n>/        history.json, entries.bin, index.bin, header.bin
//! <cache>/artifacts/<hash>.art    content-addressed artifacts shared by generations
//! ```
//!
//! A commit writes a complete new generation directory and then replaces
//! `CURRENT` atomically. Readers only ever follow `CURRENT`, so an
//! interrupted commit leaves the previous generation in effect.

use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::fs::{atomic_write, remove_dir_best_effort, sync_dir_best_effort};

/// Name of the generation pointer file.
const CURRENT_FILE: &str = "CURRENT";

/// Subdirectory holding generation directories.
const GENERATIONS_SUBDIR: &str = "generations";

/// Paths and pointer handling for one cache directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Creates a layout rooted at `root`. Nothing is touched on disk.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of generation `generation`.
    pub fn generation_dir(&self, generation: u64) -> PathBuf {
        self.root
            .join(GENERATIONS_SUBDIR)
            .join(generation.to_string())
    }

    /// Reads the committed generation number.
    ///
    /// `Ok(None)` means nothing was ever committed; a pointer that exists
    /// but cannot be read or parsed is an error.
    pub fn current_generation(&self) -> Result<Option<u64>, CacheError> {
        let path = self.root.join(CURRENT_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&path, e)),
        };
        content
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| CacheError::InvalidHeader {
                path,
                reason: format!("'{}' is not a generation number", content.trim()),
            })
    }

    /// Highest generation number found on disk, committed or not.
    ///
    /// New generations are numbered above it so that the version marker
    /// stays monotonic even across crashed or corrupted attempts.
    pub fn latest_generation_number(&self) -> u64 {
        let committed = self.current_generation().ok().flatten().unwrap_or(0);
        let on_disk = std::fs::read_dir(self.root.join(GENERATIONS_SUBDIR))
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        committed.max(on_disk)
    }

    /// Creates an empty directory for `generation`, clearing any leftover
    /// from an interrupted attempt.
    pub fn prepare_generation(&self, generation: u64) -> Result<PathBuf, CacheError> {
        let dir = self.generation_dir(generation);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(dir)
    }

    /// Atomically makes `generation` the committed one.
    pub fn publish(&self, generation: u64) -> Result<(), CacheError> {
        sync_dir_best_effort(&self.root.join(GENERATIONS_SUBDIR), "publish.generations_dir");
        atomic_write(
            &self.root.join(CURRENT_FILE),
            generation.to_string().as_bytes(),
        )
    }

    /// Removes every generation directory except `keep`. Best effort;
    /// returns the number of directories removed.
    pub fn collect_stale_generations(&self, keep: u64) -> usize {
        let Ok(entries) = std::fs::read_dir(self.root.join(GENERATIONS_SUBDIR)) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let stale = entry
                .file_name()
                .to_str()
                .map_or(true, |name| name != keep.to_string());
            if stale && remove_dir_best_effort(&entry.path(), "stale_generation") {
                removed += 1;
            }
        }
        removed
    }
}
