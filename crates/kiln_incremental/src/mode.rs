//! The per-attempt choice between a full rebuild and incremental rounds.

use std::ffi::OsStr;

use kiln_cache::history::HISTORY_FILE;
use kiln_cache::{CacheError, CacheStore, LibraryFingerprint};
use kiln_config::IncrementalConfig;

use crate::classpath::{classpath_changes, ClasspathChanges};
use crate::dirty::DirtySet;
use crate::error::RebuildReason;
use crate::modules::ModulesApiHistory;
use crate::removed::removed_file_changes;
use crate::request::BuildRequest;

/// How an attempt compiles.
#[derive(Debug, Clone)]
pub enum CompilationMode {
    /// Compile every source from scratch.
    Rebuild(RebuildReason),
    /// Compile only the dirty files, then iterate to a fixpoint.
    Incremental(DirtySet),
}

/// Decides the mode of an attempt. Runs before any front-end call.
///
/// `store` is the result of opening the committed cache.
pub fn decide(
    settings: &IncrementalConfig,
    store: Result<&CacheStore, &CacheError>,
    request: &BuildRequest,
    classpath: &[LibraryFingerprint],
    modules: &dyn ModulesApiHistory,
) -> CompilationMode {
    if !settings.enabled {
        return CompilationMode::Rebuild(RebuildReason::Disabled);
    }
    let store = match store {
        Ok(store) => store,
        Err(err) => return CompilationMode::Rebuild(open_failure_reason(err)),
    };
    let Some(snapshot) = store.snapshot() else {
        return CompilationMode::Rebuild(RebuildReason::NoHistory);
    };

    let classpath_dirty = match classpath_changes(classpath, snapshot, modules) {
        ClasspathChanges::Known(dirty) => dirty,
        ClasspathChanges::Unknown(reason) => {
            return CompilationMode::Rebuild(RebuildReason::ClasspathAmbiguous(reason))
        }
    };
    let removed_dirty = match removed_file_changes(&request.changes.removed, store) {
        Ok(dirty) => dirty,
        Err(reason) => return CompilationMode::Rebuild(reason),
    };

    let mut dirty = DirtySet::new(&settings.source_extensions);
    dirty.add_direct_files(&request.changes.modified);
    dirty.add_direct_files(&request.changes.removed);
    dirty.add_dirty_data(&classpath_dirty, store.index());
    dirty.add_dirty_data(&removed_dirty, store.index());

    tracing::debug!(
        direct = dirty.direct().len(),
        by_symbol = dirty.by_symbol().len(),
        by_declaration = dirty.by_declaration().len(),
        "initial dirty set"
    );
    CompilationMode::Incremental(dirty)
}

/// Classifies a failure to open the committed cache.
///
/// A build history that cannot be read or belongs to another tool version
/// means there is no usable snapshot; any other table, frame or pointer
/// failure is corruption of the cache store itself.
pub(crate) fn open_failure_reason(err: &CacheError) -> RebuildReason {
    match err {
        CacheError::HistoryParse { .. } | CacheError::IncompatibleToolVersion { .. } => {
            RebuildReason::HistoryUnreadable(err.to_string())
        }
        CacheError::Io { path, .. } if path.file_name() == Some(OsStr::new(HISTORY_FILE)) => {
            RebuildReason::HistoryUnreadable(err.to_string())
        }
        _ => RebuildReason::CacheCorrupt(err.to_string()),
    }
}
