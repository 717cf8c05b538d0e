//! Source and library fingerprinting, and source change detection.
//!
//! Computes content hashes for source files and classpath libraries, and
//! compares source hashes against the reverse index to find which files
//! are new, modified, deleted, or unchanged since the last build.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::index::ReverseIndex;

/// Result of comparing current source hashes against the reverse index.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files the index has never seen.
    pub new_files: Vec<PathBuf>,

    /// Files whose content hash differs from the recorded one.
    pub modified_files: Vec<PathBuf>,

    /// Files the index knows but that are no longer in the source set.
    pub deleted_files: Vec<PathBuf>,

    /// Files whose content hash matches.
    pub unchanged_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if there are no new, modified or deleted files.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the number of files that need recompiling (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }
}

/// Fingerprint of one classpath entry as recorded in the build snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFingerprint {
    /// The library path.
    pub path: PathBuf,
    /// Content hash, or `None` if it could not be computed.
    pub hash: Option<ContentHash>,
}

/// Utility for hashing sources and libraries and detecting source changes.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
        Ok(ContentHash::from_bytes(&content))
    }

    /// Computes content hashes for multiple files.
    ///
    /// Files that cannot be read are skipped; they show up as deleted in
    /// the change set.
    pub fn hash_files(paths: &[PathBuf]) -> HashMap<PathBuf, ContentHash> {
        let mut hashes = HashMap::with_capacity(paths.len());
        for path in paths {
            if let Ok(hash) = Self::hash_file(path) {
                hashes.insert(path.clone(), hash);
            }
        }
        hashes
    }

    /// Fingerprints a library: a file is hashed by content, a directory by
    /// its sorted relative paths and file contents.
    pub fn hash_library(path: &Path) -> Result<ContentHash, CacheError> {
        let meta = std::fs::metadata(path).map_err(|e| CacheError::io(path, e))?;
        if meta.is_file() {
            return Self::hash_file(path);
        }

        let mut hasher = ContentHasher::new();
        let walker = walkdir::WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let err_path = e.path().unwrap_or(path).to_path_buf();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                CacheError::io(err_path, io)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            hasher.update(relative.to_string_lossy().as_bytes());
            let content =
                std::fs::read(entry.path()).map_err(|e| CacheError::io(entry.path(), e))?;
            hasher.update(&content);
        }
        Ok(hasher.finish())
    }

    /// Fingerprints every library, recording `None` for the ones that fail.
    pub fn fingerprint_libraries(libraries: &[PathBuf]) -> Vec<LibraryFingerprint> {
        libraries
            .iter()
            .map(|path| {
                let hash = match Self::hash_library(path) {
                    Ok(hash) => Some(hash),
                    Err(err) => {
                        tracing::debug!(
                            library = %path.display(),
                            error = %err,
                            "cannot fingerprint library"
                        );
                        None
                    }
                };
                LibraryFingerprint {
                    path: path.clone(),
                    hash,
                }
            })
            .collect()
    }

    /// Compares current file hashes against the fingerprints the index
    /// recorded when each file was last compiled.
    ///
    /// A file whose recorded fingerprint is missing counts as modified.
    pub fn detect_changes(
        current_hashes: &HashMap<PathBuf, ContentHash>,
        index: &ReverseIndex,
    ) -> ChangeSet {
        let mut cs = ChangeSet::default();

        for (path, hash) in current_hashes {
            match index.file(path) {
                Some(record) if record.fingerprint == Some(*hash) => {
                    cs.unchanged_files.push(path.clone())
                }
                Some(_) => cs.modified_files.push(path.clone()),
                None => cs.new_files.push(path.clone()),
            }
        }

        cs.deleted_files = index
            .live_files()
            .filter(|r| !current_hashes.contains_key(&r.path))
            .map(|r| r.path.clone())
            .collect();

        // Sort for deterministic ordering
        cs.new_files.sort();
        cs.modified_files.sort();
        cs.unchanged_files.sort();
        cs.deleted_files.sort();
        cs
    }
}
