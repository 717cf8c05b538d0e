//! Reverse index from symbols and names to source files.
//!
//! The index is an arena of [`FileRecord`]s addressed by [`FileId`], plus
//! flat tables mapping a declaration name to its owning file, a lookup
//! symbol to the files that looked it up, and a name to the files that
//! depend on it. Records of deleted files stay in the arena as tombstones
//! so ids remain stable within a cache generation; a rebuild starts from an
//! empty arena.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, FqName, LookupSymbol};
use serde::{Deserialize, Serialize};

use crate::results::ProducedDeclaration;

/// Index of a file record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(u32);

/// Everything the index knows about one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// The source path.
    pub path: PathBuf,
    /// Content hash when the file was last compiled.
    pub fingerprint: Option<ContentHash>,
    /// Declarations the file owns.
    pub declarations: BTreeSet<FqName>,
    /// Symbols looked up by the file's declarations.
    pub lookups: BTreeSet<LookupSymbol>,
    /// Names the file's declarations depend on.
    pub depends_on: BTreeSet<FqName>,
    /// `false` once the file has been deleted.
    pub live: bool,
}

/// Persisted reverse index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReverseIndex {
    files: Vec<FileRecord>,
    by_path: BTreeMap<PathBuf, FileId>,
    owners: BTreeMap<FqName, FileId>,
    users: BTreeMap<LookupSymbol, BTreeSet<FileId>>,
    dependents: BTreeMap<FqName, BTreeSet<FileId>>,
}

impl ReverseIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record of a live file.
    pub fn file(&self, path: &Path) -> Option<&FileRecord> {
        let id = self.by_path.get(path)?;
        let record = &self.files[id.0 as usize];
        record.live.then_some(record)
    }

    /// Iterates over the records of all live files.
    pub fn live_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|r| r.live)
    }

    /// Returns the file that currently owns `fq_name`.
    pub fn owner_of(&self, fq_name: &FqName) -> Option<&Path> {
        self.owners
            .get(fq_name)
            .map(|id| self.files[id.0 as usize].path.as_path())
    }

    /// Files containing a declaration that looked up `symbol`.
    pub fn files_using(&self, symbol: &LookupSymbol) -> Vec<&Path> {
        self.paths_of(self.users.get(symbol))
    }

    /// The owner of `fq_name` and every file depending on it by name.
    pub fn files_for_name(&self, fq_name: &FqName) -> Vec<&Path> {
        let mut paths = self.paths_of(self.dependents.get(fq_name));
        if let Some(owner) = self.owner_of(fq_name) {
            if !paths.contains(&owner) {
                paths.push(owner);
            }
        }
        paths
    }

    fn paths_of(&self, ids: Option<&BTreeSet<FileId>>) -> Vec<&Path> {
        ids.into_iter()
            .flatten()
            .map(|id| &self.files[id.0 as usize])
            .filter(|r| r.live)
            .map(|r| r.path.as_path())
            .collect()
    }

    /// Replaces everything recorded for `path` with what `declarations`
    /// say about it.
    pub fn replace_file<'a>(
        &mut self,
        path: &Path,
        fingerprint: Option<ContentHash>,
        declarations: impl IntoIterator<Item = &'a ProducedDeclaration>,
    ) {
        let id = self.intern(path);
        self.unlink(id);

        let mut owned = BTreeSet::new();
        let mut lookups = BTreeSet::new();
        let mut depends_on = BTreeSet::new();
        for decl in declarations {
            owned.insert(decl.fq_name.clone());
            lookups.extend(decl.lookups.iter().cloned());
            depends_on.extend(decl.depends_on.iter().cloned());
        }

        let record = &mut self.files[id.0 as usize];
        record.fingerprint = fingerprint;
        record.declarations = owned;
        record.lookups = lookups;
        record.depends_on = depends_on;
        record.live = true;
        self.link(id);
    }

    /// Drops everything recorded for a deleted file.
    pub fn retire(&mut self, path: &Path) {
        if let Some(&id) = self.by_path.get(path) {
            self.unlink(id);
            let record = &mut self.files[id.0 as usize];
            record.fingerprint = None;
            record.live = false;
        }
    }

    /// Drops ownership of a declaration confirmed removed.
    pub fn forget_declaration(&mut self, fq_name: &FqName) {
        if let Some(id) = self.owners.remove(fq_name) {
            self.files[id.0 as usize].declarations.remove(fq_name);
        }
    }

    fn intern(&mut self, path: &Path) -> FileId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(FileRecord {
            path: path.to_path_buf(),
            fingerprint: None,
            declarations: BTreeSet::new(),
            lookups: BTreeSet::new(),
            depends_on: BTreeSet::new(),
            live: true,
        });
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    fn unlink(&mut self, id: FileId) {
        let record = &mut self.files[id.0 as usize];
        let declarations = std::mem::take(&mut record.declarations);
        let lookups = std::mem::take(&mut record.lookups);
        let depends_on = std::mem::take(&mut record.depends_on);

        for fq in &declarations {
            if self.owners.get(fq) == Some(&id) {
                self.owners.remove(fq);
            }
        }
        for sym in &lookups {
            remove_edge(&mut self.users, sym, id);
        }
        for fq in &depends_on {
            remove_edge(&mut self.dependents, fq, id);
        }
    }

    fn link(&mut self, id: FileId) {
        let record = &self.files[id.0 as usize];
        let declarations: Vec<FqName> = record.declarations.iter().cloned().collect();
        let lookups: Vec<LookupSymbol> = record.lookups.iter().cloned().collect();
        let depends_on: Vec<FqName> = record.depends_on.iter().cloned().collect();

        for fq in declarations {
            // A declaration that moved here from another file leaves that file.
            if let Some(previous) = self.owners.insert(fq.clone(), id) {
                if previous != id {
                    self.files[previous.0 as usize].declarations.remove(&fq);
                }
            }
        }
        for sym in lookups {
            self.users.entry(sym).or_default().insert(id);
        }
        for fq in depends_on {
            self.dependents.entry(fq).or_default().insert(id);
        }
    }
}

fn remove_edge<K: Ord>(table: &mut BTreeMap<K, BTreeSet<FileId>>, key: &K, id: FileId) {
    if let Some(ids) = table.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            table.remove(key);
        }
    }
}
