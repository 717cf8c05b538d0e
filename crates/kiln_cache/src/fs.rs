//! Filesystem helpers: atomic replacement and best-effort cleanup.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CacheError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `path` so that readers observe either the old content
/// or the new content, never a partial file.
///
/// The data is written and synced to a uniquely named sibling file, which
/// is then renamed over `path`. The parent directory is synced afterwards
/// so the rename is durable before anything that depends on it.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let tmp_path = tmp_sibling(path);
    let write_result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(err) = write_result {
        remove_file_best_effort(&tmp_path, "atomic_write.failed_write");
        return Err(CacheError::io(&tmp_path, err));
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        remove_file_best_effort(&tmp_path, "atomic_write.failed_rename");
        return Err(CacheError::io(path, err));
    }
    sync_dir_best_effort(parent, "atomic_write.sync_parent_dir");
    Ok(())
}

/// Flushes a directory's entries to disk. Failures are logged and ignored;
/// platforms without directory handles skip it.
pub fn sync_dir_best_effort(dir: &Path, reason: &'static str) {
    #[cfg(unix)]
    match fs::File::open(dir).and_then(|dir| dir.sync_all()) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                dir = %dir.display(),
                reason,
                error = %err,
                "failed to sync directory"
            );
        }
    }

    #[cfg(not(unix))]
    let _ = (dir, reason);
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{file_name}.tmp.{}.{counter}",
        std::process::id()
    ))
}

/// Removes a file, treating "already gone" as success. Other failures are
/// logged and reported as `false`.
pub fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove cache file"
            );
            false
        }
    }
}

/// Recursively removes a directory, with the same semantics as
/// [`remove_file_best_effort`].
pub fn remove_dir_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove cache directory"
            );
            false
        }
    }
}
