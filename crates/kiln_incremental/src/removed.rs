//! Detection of declarations that disappeared.
//!
//! A declaration can vanish because its whole file was deleted, which is
//! known before the first round, or because an edit dropped it from a file
//! that still exists, which only shows once that file has been recompiled.

use std::collections::BTreeSet;
use std::path::PathBuf;

use kiln_cache::{CacheStore, CompileOutput, DirtyData};
use kiln_common::FqName;

use crate::error::RebuildReason;

/// Names and symbols of every declaration recorded for the removed files.
///
/// Fails if a recorded declaration has no cache entry, since its member
/// symbols can then not be invalidated.
pub fn removed_file_changes(
    removed: &[PathBuf],
    store: &CacheStore,
) -> Result<DirtyData, RebuildReason> {
    let mut dirty = DirtyData::default();
    for path in removed {
        let Some(record) = store.index().file(path) else {
            continue;
        };
        for fq_name in &record.declarations {
            let entry = store
                .entry(fq_name)
                .ok_or_else(|| RebuildReason::RemovedDeclarationUnresolved(fq_name.clone()))?;
            dirty.fq_names.insert(fq_name.clone());
            dirty.lookup_symbols.insert(fq_name.own_symbol());
            dirty.lookup_symbols.extend(entry.members.keys().cloned());
        }
    }
    Ok(dirty)
}

/// Declarations owned by `files` according to the index, collected before a
/// round updates it.
pub fn owned_declarations<'a>(
    files: impl IntoIterator<Item = &'a PathBuf>,
    store: &CacheStore,
) -> BTreeSet<FqName> {
    files
        .into_iter()
        .filter_map(|path| store.index().file(path))
        .flat_map(|record| record.declarations.iter().cloned())
        .collect()
}

/// Declarations that were owned before the round and that the round did
/// not produce again.
pub fn detect_removed(previously_owned: &BTreeSet<FqName>, output: &CompileOutput) -> BTreeSet<FqName> {
    let produced: BTreeSet<&FqName> = output.declarations.iter().map(|d| &d.fq_name).collect();
    previously_owned
        .iter()
        .filter(|fq| !produced.contains(fq))
        .cloned()
        .collect()
}
