//! The set of files an attempt must recompile.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_cache::{DirtyData, ReverseIndex};
use kiln_common::{FqName, LookupSymbol};

/// Files marked dirty during one attempt, grouped by why they were marked.
///
/// The set only grows. Files outside the configured source extensions
/// never enter it.
#[derive(Debug, Clone, Default)]
pub struct DirtySet {
    direct: BTreeSet<PathBuf>,
    by_symbol: BTreeSet<PathBuf>,
    by_declaration: BTreeSet<PathBuf>,
    union: BTreeSet<PathBuf>,
    extensions: Vec<String>,
}

impl DirtySet {
    /// Creates an empty set accepting files with the given extensions, or
    /// every file when `extensions` is empty.
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.to_vec(),
            ..Self::default()
        }
    }

    /// Marks files changed by the user. Returns how many were not dirty yet.
    pub fn add_direct_files<'a>(&mut self, files: impl IntoIterator<Item = &'a PathBuf>) -> usize {
        let mut added = 0;
        for file in files {
            added += self.insert(file, Reason::Direct);
        }
        added
    }

    /// Marks every file that looked up one of `symbols`.
    pub fn add_by_lookup_symbols<'a>(
        &mut self,
        symbols: impl IntoIterator<Item = &'a LookupSymbol>,
        index: &ReverseIndex,
    ) -> usize {
        let mut added = 0;
        for symbol in symbols {
            let files = index.files_using(symbol);
            if files.is_empty() {
                tracing::trace!(%symbol, "symbol has no users");
            }
            for file in files {
                added += self.insert(file, Reason::Symbol);
            }
        }
        added
    }

    /// Marks the owner of each name and every file depending on it.
    pub fn add_by_declaration_names<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a FqName>,
        index: &ReverseIndex,
    ) -> usize {
        let mut added = 0;
        for name in names {
            let files = index.files_for_name(name);
            if files.is_empty() {
                tracing::trace!(%name, "name has no owner or dependents");
            }
            for file in files {
                added += self.insert(file, Reason::Declaration);
            }
        }
        added
    }

    /// Marks everything `dirty` resolves to.
    pub fn add_dirty_data(&mut self, dirty: &DirtyData, index: &ReverseIndex) -> usize {
        self.add_by_lookup_symbols(&dirty.lookup_symbols, index)
            + self.add_by_declaration_names(&dirty.fq_names, index)
    }

    /// The sorted union of all dirty files.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.union.iter().cloned().collect()
    }

    /// Returns `true` if `file` is dirty.
    pub fn contains(&self, file: &Path) -> bool {
        self.union.contains(file)
    }

    /// Number of dirty files.
    pub fn len(&self) -> usize {
        self.union.len()
    }

    /// Returns `true` if no file is dirty.
    pub fn is_empty(&self) -> bool {
        self.union.is_empty()
    }

    /// Files marked directly.
    pub fn direct(&self) -> &BTreeSet<PathBuf> {
        &self.direct
    }

    /// Files marked through a changed symbol.
    pub fn by_symbol(&self) -> &BTreeSet<PathBuf> {
        &self.by_symbol
    }

    /// Files marked through a changed declaration name.
    pub fn by_declaration(&self) -> &BTreeSet<PathBuf> {
        &self.by_declaration
    }

    /// Returns `true` if `file` has an accepted extension.
    pub fn accepts(&self, file: &Path) -> bool {
        has_source_extension(file, &self.extensions)
    }

    fn insert(&mut self, file: &Path, reason: Reason) -> usize {
        if !self.accepts(file) {
            return 0;
        }
        let group = match reason {
            Reason::Direct => &mut self.direct,
            Reason::Symbol => &mut self.by_symbol,
            Reason::Declaration => &mut self.by_declaration,
        };
        group.insert(file.to_path_buf());
        usize::from(self.union.insert(file.to_path_buf()))
    }
}

#[derive(Clone, Copy)]
enum Reason {
    Direct,
    Symbol,
    Declaration,
}

/// Returns `true` if `file` has one of `extensions`, or if `extensions` is
/// empty.
pub(crate) fn has_source_extension(file: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    file.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}
