//! High-level cache manager.
//!
//! `CacheStore` ties together the generation layout, the artifact store,
//! the reverse index and the build history. All mutations during an
//! attempt happen in memory (artifacts aside, which are immutable and
//! content-addressed); nothing becomes visible to the next build until
//! [`CacheStore::commit`] swaps the generation pointer.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, FqName, LookupSymbol};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactStore;
use crate::changes::ChangeReport;
use crate::error::CacheError;
use crate::frame::{decode_frame, decode_value, encode_frame, encode_value};
use crate::fs::{atomic_write, sync_dir_best_effort};
use crate::hasher::LibraryFingerprint;
use crate::history::{BuildDiff, BuildHistory, BuildSnapshot};
use crate::index::ReverseIndex;
use crate::layout::CacheLayout;
use crate::results::{CompileOutput, CompiledSource, ProducedDeclaration, Visibility};

/// Declaration table file within a generation directory.
const ENTRIES_FILE: &str = "entries.bin";

/// Reverse index file within a generation directory.
const INDEX_FILE: &str = "index.bin";

/// Module header file within a generation directory.
const HEADER_FILE: &str = "header.bin";

/// Cached state of one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key of the artifact in the artifact store.
    pub artifact_key: String,
    /// Fingerprint of the declaration's own signature.
    pub shape: ContentHash,
    /// Fingerprints of the declaration's members.
    pub members: BTreeMap<LookupSymbol, ContentHash>,
    /// API visibility.
    pub visibility: Visibility,
}

/// Read access to cached compilation results, handed to the front-end
/// during incremental rounds so it can reuse artifacts of declarations it
/// is not recompiling.
pub trait ArtifactProvider {
    /// The module header recorded by the last compile, if any.
    fn header(&self) -> Option<&[u8]>;

    /// The cached artifact of `fq_name`, or `None` if it is not cached.
    fn read_artifact(&self, fq_name: &FqName) -> Result<Option<Vec<u8>>, CacheError>;
}

/// The cache manager for one module.
pub struct CacheStore {
    layout: CacheLayout,
    artifacts: ArtifactStore,
    tool_version: String,
    committed: Option<u64>,
    history: BuildHistory,
    entries: BTreeMap<FqName, CacheEntry>,
    index: ReverseIndex,
    header: Option<Vec<u8>>,
    /// First artifact read failure since the last [`CacheStore::take_read_fault`].
    read_fault: RefCell<Option<String>>,
}

impl CacheStore {
    fn empty(root: &Path, tool_version: &str) -> Self {
        Self {
            layout: CacheLayout::new(root),
            artifacts: ArtifactStore::new(root, tool_version),
            tool_version: tool_version.to_string(),
            committed: None,
            history: BuildHistory::default(),
            entries: BTreeMap::new(),
            index: ReverseIndex::new(),
            header: None,
            read_fault: RefCell::new(None),
        }
    }

    /// Loads the committed generation at `root`.
    ///
    /// A directory with no committed generation yields an empty store
    /// without a snapshot. Anything unreadable, and a cache written by a
    /// different tool version, is an error.
    pub fn open(root: &Path, tool_version: &str) -> Result<Self, CacheError> {
        let mut store = Self::empty(root, tool_version);
        let Some(generation) = store.layout.current_generation()? else {
            return Ok(store);
        };

        let dir = store.layout.generation_dir(generation);
        let history = BuildHistory::load(&dir)?;
        if let Some(snapshot) = &history.snapshot {
            if snapshot.tool_version != tool_version {
                return Err(CacheError::IncompatibleToolVersion {
                    expected: tool_version.to_string(),
                    found: snapshot.tool_version.clone(),
                });
            }
        }

        store.entries = read_table(&dir.join(ENTRIES_FILE))?;
        store.index = read_table(&dir.join(INDEX_FILE))?;
        store.header = read_header(&dir.join(HEADER_FILE))?;
        store.history = history;
        store.committed = Some(generation);

        tracing::debug!(
            cache = %root.display(),
            generation,
            entries = store.entries.len(),
            "opened cache"
        );
        Ok(store)
    }

    /// Creates an empty store for a full rebuild.
    ///
    /// The build diffs of the previous history are carried over when they
    /// can be read, so downstream modules keep seeing a continuous log.
    pub fn fresh(root: &Path, tool_version: &str) -> Self {
        let mut store = Self::empty(root, tool_version);
        match BuildHistory::load_committed(root) {
            Ok(Some(previous)) => store.history.diffs = previous.diffs,
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(
                    cache = %root.display(),
                    error = %err,
                    "previous build history unreadable; starting a new diff log"
                );
            }
        }
        store
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// The snapshot of the last successful build.
    pub fn snapshot(&self) -> Option<&BuildSnapshot> {
        self.history.snapshot.as_ref()
    }

    /// The full build history as loaded or last committed.
    pub fn history(&self) -> &BuildHistory {
        &self.history
    }

    /// The generation this store was loaded from or last committed to.
    pub fn committed_generation(&self) -> Option<u64> {
        self.committed
    }

    /// The reverse index.
    pub fn index(&self) -> &ReverseIndex {
        &self.index
    }

    /// The cached entry of `fq_name`.
    pub fn entry(&self, fq_name: &FqName) -> Option<&CacheEntry> {
        self.entries.get(fq_name)
    }

    /// Number of cached declarations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no declaration is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns and clears the first artifact read failure seen through
    /// [`ArtifactProvider::read_artifact`].
    ///
    /// The front-end may swallow such a failure, so the caller checks this
    /// after every compile and treats a fault as cache corruption.
    pub fn take_read_fault(&mut self) -> Option<String> {
        self.read_fault.get_mut().take()
    }

    /// Compares a round's output against the cached entries, stores the new
    /// artifacts and index records, and reports what changed shape.
    ///
    /// Artifacts are written even when the shape is unchanged, since the
    /// compiled form can differ in ways invisible to dependents.
    pub fn compare_and_update(
        &mut self,
        sources: &[CompiledSource],
        output: &CompileOutput,
    ) -> Result<ChangeReport, CacheError> {
        let mut report = ChangeReport::default();

        for decl in &output.declarations {
            let entry = CacheEntry {
                artifact_key: self.artifacts.write_artifact(&decl.artifact)?,
                shape: decl.shape,
                members: decl.members.clone(),
                visibility: decl.visibility,
            };
            match self.entries.get(&decl.fq_name) {
                Some(old) => diff_entry(&mut report, &decl.fq_name, old, &entry),
                None => record_added(&mut report, &decl.fq_name, &entry),
            }
            self.entries.insert(decl.fq_name.clone(), entry);
        }

        let mut by_source: BTreeMap<&Path, Vec<&ProducedDeclaration>> = BTreeMap::new();
        for decl in &output.declarations {
            by_source
                .entry(decl.source.as_path())
                .or_default()
                .push(decl);
        }
        for source in sources {
            let decls = by_source.remove(source.path.as_path()).unwrap_or_default();
            self.index
                .replace_file(&source.path, source.fingerprint, decls);
        }
        for (path, decls) in by_source {
            tracing::debug!(
                source = %path.display(),
                "front-end produced declarations for a file outside the round"
            );
            self.index.replace_file(path, None, decls);
        }

        if let Some(header) = &output.header {
            if self.header.as_deref() != Some(header.as_slice()) {
                tracing::debug!(bytes = header.len(), "module header changed");
            }
            self.header = Some(header.clone());
        }

        Ok(report)
    }

    /// Deletes the entries of declarations confirmed gone and reports their
    /// names and symbols as changed.
    pub fn clear_for_removed(&mut self, removed: &BTreeSet<FqName>) -> ChangeReport {
        let mut report = ChangeReport::default();
        for fq_name in removed {
            if let Some(entry) = self.entries.remove(fq_name) {
                report.record_removed(fq_name, entry.visibility);
                for symbol in entry.members.keys() {
                    report.record_symbol(symbol.clone(), entry.visibility);
                }
            }
            self.index.forget_declaration(fq_name);
        }
        report
    }

    /// Drops the index records of deleted source files.
    pub fn retire_sources(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.index.retire(path);
        }
    }

    /// Writes the in-memory state as a new generation and makes it current.
    ///
    /// Returns the new generation number, which is also the snapshot's
    /// version marker. On error the previously committed generation stays
    /// in effect.
    pub fn commit(
        &mut self,
        started_at_ms: u64,
        classpath: Vec<LibraryFingerprint>,
        diff: BuildDiff,
        keep_diffs: usize,
    ) -> Result<u64, CacheError> {
        let generation = self.layout.latest_generation_number() + 1;
        let dir = self.layout.prepare_generation(generation)?;

        let mut history = self.history.clone();
        history.snapshot = Some(BuildSnapshot {
            tool_version: self.tool_version.clone(),
            version: generation,
            started_at_ms,
            classpath,
        });
        history.push_diff(diff, keep_diffs);

        history.save(&dir)?;
        atomic_write(
            &dir.join(ENTRIES_FILE),
            &encode_value(&self.entries, &self.tool_version)?,
        )?;
        atomic_write(
            &dir.join(INDEX_FILE),
            &encode_value(&self.index, &self.tool_version)?,
        )?;
        if let Some(header) = &self.header {
            atomic_write(
                &dir.join(HEADER_FILE),
                &encode_frame(header, &self.tool_version)?,
            )?;
        }
        sync_dir_best_effort(&dir, "commit.generation_dir");
        self.layout.publish(generation)?;

        self.history = history;
        self.committed = Some(generation);
        tracing::info!(
            cache = %self.root().display(),
            generation,
            entries = self.entries.len(),
            "cache committed"
        );

        self.collect_garbage(generation);
        Ok(generation)
    }

    fn collect_garbage(&self, generation: u64) {
        let generations = self.layout.collect_stale_generations(generation);
        let live = self.entries.values().map(|e| e.artifact_key.as_str());
        match self.artifacts.gc(live) {
            Ok(artifacts) => {
                tracing::debug!(generations, artifacts, "collected stale cache files")
            }
            Err(err) => tracing::debug!(error = %err, "artifact collection failed"),
        }
    }
}

impl ArtifactProvider for CacheStore {
    fn header(&self) -> Option<&[u8]> {
        self.header.as_deref()
    }

    fn read_artifact(&self, fq_name: &FqName) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(entry) = self.entries.get(fq_name) else {
            return Ok(None);
        };
        self.artifacts
            .read_artifact(&entry.artifact_key)
            .map(Some)
            .inspect_err(|err| {
                tracing::debug!(%fq_name, error = %err, "cached artifact unreadable");
                self.read_fault
                    .borrow_mut()
                    .get_or_insert_with(|| format!("artifact of {fq_name}: {err}"));
            })
    }
}

fn record_added(report: &mut ChangeReport, fq_name: &FqName, entry: &CacheEntry) {
    report.record_signature(fq_name, entry.visibility);
    for symbol in entry.members.keys() {
        report.record_symbol(symbol.clone(), entry.visibility);
    }
}

fn diff_entry(report: &mut ChangeReport, fq_name: &FqName, old: &CacheEntry, new: &CacheEntry) {
    // Narrowing visibility is a public change too.
    let visibility = if old.visibility == Visibility::Public || new.visibility == Visibility::Public
    {
        Visibility::Public
    } else {
        Visibility::Internal
    };

    if old.shape != new.shape || old.visibility != new.visibility {
        report.record_signature(fq_name, visibility);
    }
    for (symbol, hash) in &new.members {
        if old.members.get(symbol) != Some(hash) {
            report.record_symbol(symbol.clone(), visibility);
        }
    }
    for symbol in old.members.keys() {
        if !new.members.contains_key(symbol) {
            report.record_symbol(symbol.clone(), visibility);
        }
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    let raw = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    decode_value(path, &raw)
}

fn read_header(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    Ok(Some(decode_frame(path, &raw)?.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::DirtyData;

    const VERSION: &str = "0.1.0";

    fn decl(fq: &str, source: &str, shape: &str, members: &[(&str, &str)]) -> ProducedDeclaration {
        let fq_name = FqName::new(fq);
        ProducedDeclaration {
            source: PathBuf::from(source),
            artifact: format!("{fq}:{shape}").into_bytes(),
            shape: ContentHash::from_bytes(shape.as_bytes()),
            members: members
                .iter()
                .map(|(name, sig)| (fq_name.member(name), ContentHash::from_bytes(sig.as_bytes())))
                .collect(),
            lookups: Vec::new(),
            depends_on: Vec::new(),
            visibility: Visibility::Public,
            fq_name,
        }
    }

    fn compiled(paths: &[&str]) -> Vec<CompiledSource> {
        paths
            .iter()
            .map(|p| CompiledSource {
                path: PathBuf::from(p),
                fingerprint: Some(ContentHash::from_bytes(p.as_bytes())),
            })
            .collect()
    }

    fn output(decls: Vec<ProducedDeclaration>) -> CompileOutput {
        CompileOutput {
            declarations: decls,
            header: None,
        }
    }

    fn incremental_diff(ts: u64) -> BuildDiff {
        BuildDiff {
            ts,
            is_incremental: true,
            dirty: DirtyData::default(),
        }
    }

    #[test]
    fn open_empty_dir_has_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path(), VERSION).unwrap();
        assert!(store.snapshot().is_none());
        assert!(store.is_empty());
        assert_eq!(store.committed_generation(), None);
    }

    #[test]
    fn added_declaration_reports_name_and_members() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let report = store
            .compare_and_update(
                &compiled(&["a.kn"]),
                &output(vec![decl("app.A", "a.kn", "v1", &[("run", "()")])]),
            )
            .unwrap();
        assert!(report.all.fq_names.contains(&FqName::new("app.A")));
        assert!(report.all.lookup_symbols.contains(&LookupSymbol::new("app", "A")));
        assert!(report.all.lookup_symbols.contains(&LookupSymbol::new("app.A", "run")));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.index().owner_of(&FqName::new("app.A")),
            Some(Path::new("a.kn"))
        );
    }

    #[test]
    fn unchanged_shape_reports_nothing_but_rewrites_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let sources = compiled(&["a.kn"]);
        store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();

        let mut again = decl("app.A", "a.kn", "v1", &[]);
        again.artifact = b"same shape, new line numbers".to_vec();
        let report = store.compare_and_update(&sources, &output(vec![again])).unwrap();
        assert!(report.is_empty());
        assert_eq!(
            store.read_artifact(&FqName::new("app.A")).unwrap().unwrap(),
            b"same shape, new line numbers"
        );
    }

    #[test]
    fn member_change_reports_only_that_member() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let sources = compiled(&["a.kn"]);
        store
            .compare_and_update(
                &sources,
                &output(vec![decl("app.A", "a.kn", "v1", &[("run", "()"), ("stop", "()")])]),
            )
            .unwrap();
        let report = store
            .compare_and_update(
                &sources,
                &output(vec![decl("app.A", "a.kn", "v1", &[("run", "(Int)"), ("stop", "()")])]),
            )
            .unwrap();
        assert!(report.all.fq_names.is_empty());
        assert_eq!(
            report.all.lookup_symbols.iter().collect::<Vec<_>>(),
            vec![&LookupSymbol::new("app.A", "run")]
        );
    }

    #[test]
    fn removed_member_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let sources = compiled(&["a.kn"]);
        store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v1", &[("run", "()")])]))
            .unwrap();
        let report = store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        assert!(report.all.lookup_symbols.contains(&LookupSymbol::new("app.A", "run")));
    }

    #[test]
    fn shape_change_reports_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let sources = compiled(&["a.kn"]);
        store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        let report = store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v2", &[])]))
            .unwrap();
        assert_eq!(report.all.fq_names.len(), 1);
        assert_eq!(report.public.fq_names.len(), 1);
    }

    #[test]
    fn clear_for_removed_drops_entry_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store
            .compare_and_update(
                &compiled(&["a.kn"]),
                &output(vec![decl("app.Gone", "a.kn", "v1", &[("f", "()")])]),
            )
            .unwrap();

        let removed: BTreeSet<FqName> = [FqName::new("app.Gone")].into_iter().collect();
        let report = store.clear_for_removed(&removed);
        assert!(report.removed.contains(&FqName::new("app.Gone")));
        assert!(report.all.lookup_symbols.contains(&LookupSymbol::new("app", "Gone")));
        assert!(report.all.lookup_symbols.contains(&LookupSymbol::new("app.Gone", "f")));
        assert!(store.entry(&FqName::new("app.Gone")).is_none());
        assert!(store.index().owner_of(&FqName::new("app.Gone")).is_none());
        assert_eq!(store.read_artifact(&FqName::new("app.Gone")).unwrap(), None);
    }

    #[test]
    fn commit_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
            let mut out = output(vec![decl("app.A", "a.kn", "v1", &[])]);
            out.header = Some(b"module header".to_vec());
            store.compare_and_update(&compiled(&["a.kn"]), &out).unwrap();
            let generation = store.commit(42, Vec::new(), incremental_diff(42), 10).unwrap();
            assert_eq!(generation, 1);
        }

        let store = CacheStore::open(dir.path(), VERSION).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.started_at_ms, 42);
        assert_eq!(store.len(), 1);
        assert_eq!(store.header(), Some(&b"module header"[..]));
        assert_eq!(
            store.read_artifact(&FqName::new("app.A")).unwrap().unwrap(),
            b"app.A:v1"
        );
        assert_eq!(store.history().diffs.len(), 1);
    }

    #[test]
    fn version_marker_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let first = store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();
        let second = store.commit(2, Vec::new(), incremental_diff(2), 10).unwrap();
        assert!(second > first);

        let mut fresh = CacheStore::fresh(dir.path(), VERSION);
        let third = fresh.commit(3, Vec::new(), incremental_diff(3), 10).unwrap();
        assert!(third > second);
        assert_eq!(fresh.history().diffs.len(), 3);
    }

    #[test]
    fn uncommitted_changes_are_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store
            .compare_and_update(&compiled(&["a.kn"]), &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();

        store
            .compare_and_update(&compiled(&["b.kn"]), &output(vec![decl("app.B", "b.kn", "v1", &[])]))
            .unwrap();
        drop(store);

        let reopened = CacheStore::open(dir.path(), VERSION).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.entry(&FqName::new("app.B")).is_none());
    }

    #[test]
    fn interrupted_commit_keeps_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();

        // A generation directory written but never published.
        let layout = CacheLayout::new(dir.path());
        let orphan = layout.prepare_generation(7).unwrap();
        std::fs::write(orphan.join(ENTRIES_FILE), b"partial").unwrap();

        let reopened = CacheStore::open(dir.path(), VERSION).unwrap();
        assert_eq!(reopened.committed_generation(), Some(1));
    }

    #[test]
    fn corrupt_table_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let generation = store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();
        let entries = CacheLayout::new(dir.path())
            .generation_dir(generation)
            .join(ENTRIES_FILE);
        std::fs::write(entries, b"garbage").unwrap();
        assert!(CacheStore::open(dir.path(), VERSION).is_err());
    }

    #[test]
    fn other_tool_version_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();
        let err = CacheStore::open(dir.path(), "9.9.9").err().unwrap();
        assert!(matches!(err, CacheError::IncompatibleToolVersion { .. }));
    }

    #[test]
    fn commit_collects_unreferenced_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        let sources = compiled(&["a.kn"]);
        store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        store
            .compare_and_update(&sources, &output(vec![decl("app.A", "a.kn", "v2", &[])]))
            .unwrap();
        store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();

        let artifacts = std::fs::read_dir(dir.path().join("artifacts")).unwrap().count();
        assert_eq!(artifacts, 1);
    }

    #[test]
    fn failed_artifact_read_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store
            .compare_and_update(&compiled(&["a.kn"]), &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        let key = store.entry(&FqName::new("app.A")).unwrap().artifact_key.clone();
        std::fs::write(store.artifacts.artifact_path(&key), b"xx").unwrap();

        assert!(store.read_artifact(&FqName::new("app.A")).is_err());
        assert!(store.read_artifact(&FqName::new("app.A")).is_err());
        let fault = store.take_read_fault().unwrap();
        assert!(fault.contains("app.A"));
        assert_eq!(store.take_read_fault(), None);
        assert_eq!(store.read_artifact(&FqName::new("app.Missing")).unwrap(), None);
        assert_eq!(store.take_read_fault(), None);
    }

    #[test]
    fn rebuild_replaces_damaged_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sources = compiled(&["a.kn"]);
        let out = output(vec![decl("app.A", "a.kn", "v1", &[])]);
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store.compare_and_update(&sources, &out).unwrap();
        store.commit(1, Vec::new(), incremental_diff(1), 10).unwrap();
        let key = store.entry(&FqName::new("app.A")).unwrap().artifact_key.clone();
        std::fs::write(store.artifacts.artifact_path(&key), b"xx").unwrap();

        let mut fresh = CacheStore::fresh(dir.path(), VERSION);
        fresh.compare_and_update(&sources, &out).unwrap();
        fresh.commit(2, Vec::new(), incremental_diff(2), 10).unwrap();

        let reopened = CacheStore::open(dir.path(), VERSION).unwrap();
        assert_eq!(
            reopened.read_artifact(&FqName::new("app.A")).unwrap().unwrap(),
            b"app.A:v1"
        );
    }

    #[test]
    fn retire_sources_drops_index_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), VERSION).unwrap();
        store
            .compare_and_update(&compiled(&["a.kn"]), &output(vec![decl("app.A", "a.kn", "v1", &[])]))
            .unwrap();
        store.retire_sources(&[PathBuf::from("a.kn")]);
        assert!(store.index().file(Path::new("a.kn")).is_none());
    }
}
