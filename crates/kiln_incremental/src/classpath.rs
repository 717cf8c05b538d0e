//! Classpath change detection.
//!
//! Turns library fingerprint changes into the set of symbols and names they
//! affect, using the build diffs of the module that produced each library.
//! Anything that cannot be attributed precisely yields
//! [`ClasspathChanges::Unknown`].

use std::collections::BTreeMap;
use std::path::Path;

use kiln_cache::{BuildSnapshot, DirtyData, LibraryFingerprint};
use kiln_common::ContentHash;

use crate::modules::ModulesApiHistory;

/// Result of classpath change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathChanges {
    /// The exact symbols and names changed on the classpath.
    Known(DirtyData),
    /// Changes could not be attributed; carries the reason.
    Unknown(String),
}

/// Compares `current` library fingerprints against the previous build.
pub fn classpath_changes(
    current: &[LibraryFingerprint],
    snapshot: &BuildSnapshot,
    modules: &dyn ModulesApiHistory,
) -> ClasspathChanges {
    let previous: BTreeMap<&Path, Option<ContentHash>> = snapshot
        .classpath
        .iter()
        .map(|lib| (lib.path.as_path(), lib.hash))
        .collect();

    if let Some(lib) = current.iter().find(|lib| lib.hash.is_none()) {
        return ClasspathChanges::Unknown(format!(
            "cannot fingerprint library {}",
            lib.path.display()
        ));
    }

    let current_paths: BTreeMap<&Path, Option<ContentHash>> = current
        .iter()
        .map(|lib| (lib.path.as_path(), lib.hash))
        .collect();
    if let Some(removed) = previous.keys().find(|p| !current_paths.contains_key(*p)) {
        return ClasspathChanges::Unknown(format!(
            "library {} was removed from the classpath",
            removed.display()
        ));
    }

    let mut dirty = DirtyData::default();
    for lib in current {
        let changed = match previous.get(lib.path.as_path()) {
            Some(Some(hash)) => lib.hash != Some(*hash),
            // A newly added library only dirties what its module's diffs name
            // since our last build; with no such diffs it contributes nothing.
            Some(None) | None => true,
        };
        if !changed {
            continue;
        }
        match library_changes(&lib.path, snapshot.started_at_ms, modules) {
            Ok(changes) => {
                tracing::debug!(
                    library = %lib.path.display(),
                    symbols = changes.lookup_symbols.len(),
                    names = changes.fq_names.len(),
                    "resolved library changes"
                );
                dirty.extend(&changes);
            }
            Err(reason) => return ClasspathChanges::Unknown(reason),
        }
    }
    ClasspathChanges::Known(dirty)
}

fn library_changes(
    library: &Path,
    last_build_ms: u64,
    modules: &dyn ModulesApiHistory,
) -> Result<DirtyData, String> {
    let record = modules
        .resolve(library)
        .ok_or_else(|| format!("no producing module for library {}", library.display()))?;
    let diffs = record
        .diffs
        .ok_or_else(|| format!("module '{}' has no readable build history", record.module))?;

    let (known, new): (Vec<_>, Vec<_>) = diffs.iter().partition(|d| d.ts <= last_build_ms);
    if known.is_empty() {
        return Err(format!(
            "build history of module '{}' does not reach back to the previous build",
            record.module
        ));
    }
    if new.iter().any(|d| !d.is_incremental) {
        return Err(format!(
            "module '{}' was rebuilt non-incrementally",
            record.module
        ));
    }

    let mut dirty = DirtyData::default();
    for diff in new {
        dirty.extend(&diff.dirty);
    }
    Ok(dirty)
}
