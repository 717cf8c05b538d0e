//! The fixpoint driver.
//!
//! One [`IncrementalDriver::build`] call is one attempt:
//!
//! ```text
//! decide ──► Rebuild ───────────────────────────────► commit
//!        └─► Incremental ─► round ─► diff ─► grew? ──► round ...
//!                                         └─ no ───► commit
//!                                 budget exceeded ───► Rebuild
//! ```
//!
//! Every round compiles the existing files of the current dirty union,
//! updates the in-memory cache and resolves the reported changes through the
//! reverse index. Nothing reaches disk until the attempt commits, so a
//! failed or cancelled attempt leaves the previous build in effect.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_cache::{
    BuildDiff, CacheStore, CompileOutput, CompiledSource, DirtyData,
    LibraryFingerprint, SourceHasher,
};
use kiln_config::{IncrementalConfig, ResolvedConfig};

use crate::cancel::CancelFlag;
use crate::dirty::{has_source_extension, DirtySet};
use crate::error::{BuildError, BuildOutcome, RebuildReason};
use crate::frontend::{CompileFailure, CompileRequest, FrontEnd};
use crate::mode::{decide, open_failure_reason, CompilationMode};
use crate::modules::ModulesApiHistory;
use crate::removed::{detect_removed, owned_declarations};
use crate::request::{BuildRequest, ChangedFiles};

/// Drives build attempts for one module.
pub struct IncrementalDriver<F, M> {
    settings: IncrementalConfig,
    cache_dir: PathBuf,
    tool_version: String,
    frontend: F,
    modules: M,
}

/// How the fixpoint loop ended.
enum Fixpoint {
    Converged { version: u64, rounds: u32 },
    Fallback(RebuildReason),
}

/// Mutable state of one incremental attempt.
struct Attempt<'r> {
    request: &'r BuildRequest,
    store: CacheStore,
    dirty: DirtySet,
    removed: BTreeSet<&'r Path>,
    sources: BTreeSet<&'r Path>,
    public: DirtyData,
    rounds: u32,
}

impl<'r> Attempt<'r> {
    fn new(request: &'r BuildRequest, store: CacheStore, dirty: DirtySet) -> Self {
        Self {
            request,
            store,
            dirty,
            removed: request.changes.removed.iter().map(PathBuf::as_path).collect(),
            sources: request.sources.iter().map(PathBuf::as_path).collect(),
            public: DirtyData::default(),
            rounds: 0,
        }
    }

    /// Dirty files that still exist, sorted.
    fn round_sources(&self) -> Vec<PathBuf> {
        self.dirty
            .snapshot()
            .into_iter()
            .filter(|p| self.sources.contains(p.as_path()) && !self.removed.contains(p.as_path()))
            .collect()
    }
}

impl<F: FrontEnd, M: ModulesApiHistory> IncrementalDriver<F, M> {
    /// Creates a driver for the module described by `config`.
    pub fn new(config: &ResolvedConfig, tool_version: impl Into<String>, frontend: F, modules: M) -> Self {
        Self {
            settings: config.incremental.clone(),
            cache_dir: config.cache_dir.clone(),
            tool_version: tool_version.into(),
            frontend,
            modules,
        }
    }

    /// The front-end.
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// The front-end, mutably.
    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// The cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Derives the changed files of `sources` from the committed cache.
    /// Without a usable cache every source counts as modified.
    pub fn detect_changes(&self, sources: &[PathBuf]) -> ChangedFiles {
        match CacheStore::open(&self.cache_dir, &self.tool_version) {
            Ok(store) => ChangedFiles::detect(sources, store.index()),
            Err(err) => {
                tracing::debug!(error = %err, "cache unreadable; treating every source as modified");
                ChangedFiles::new(sources.to_vec(), Vec::new())
            }
        }
    }

    /// Runs one build attempt.
    pub fn build(&mut self, request: &BuildRequest, cancel: &CancelFlag) -> Result<BuildOutcome, BuildError> {
        let span = tracing::info_span!("build", cache = %self.cache_dir.display());
        let _guard = span.enter();

        let cancel = match self.settings.attempt_timeout_secs {
            Some(secs) => cancel.with_timeout(Duration::from_secs(secs)),
            None => cancel.clone(),
        };
        let classpath = SourceHasher::fingerprint_libraries(&request.libraries);
        let opened = CacheStore::open(&self.cache_dir, &self.tool_version);

        let mode = decide(&self.settings, opened.as_ref(), request, &classpath, &self.modules);
        let (store, dirty) = match (mode, opened) {
            (CompilationMode::Incremental(dirty), Ok(store)) => (store, dirty),
            (CompilationMode::Rebuild(reason), _) => {
                return self.rebuild(request, classpath, reason, &cancel);
            }
            (CompilationMode::Incremental(_), Err(err)) => {
                let reason = open_failure_reason(&err);
                return self.rebuild(request, classpath, reason, &cancel);
            }
        };

        tracing::info!(dirty = dirty.len(), "compiling incrementally");
        let attempt = Attempt::new(request, store, dirty);
        match self.run_fixpoint(attempt, classpath.clone(), &cancel)? {
            Fixpoint::Converged { version, rounds } => {
                tracing::info!(version, rounds, "incremental build converged");
                Ok(BuildOutcome::Converged { version, rounds })
            }
            Fixpoint::Fallback(reason) => self.rebuild(request, classpath, reason, &cancel),
        }
    }

    fn run_fixpoint(
        &mut self,
        mut attempt: Attempt<'_>,
        classpath: Vec<LibraryFingerprint>,
        cancel: &CancelFlag,
    ) -> Result<Fixpoint, BuildError> {
        let max_rounds = self.settings.max_rounds;
        while attempt.rounds < max_rounds {
            attempt.rounds += 1;
            let grown = match self.run_round(&mut attempt, cancel)? {
                Ok(grown) => grown,
                Err(reason) => return Ok(Fixpoint::Fallback(reason)),
            };
            if grown == 0 {
                let diff = BuildDiff {
                    ts: attempt.request.started_at_ms,
                    is_incremental: true,
                    dirty: attempt.public,
                };
                let committed = attempt.store.commit(
                    attempt.request.started_at_ms,
                    classpath,
                    diff,
                    self.settings.build_diffs_kept,
                );
                return Ok(match committed {
                    Ok(version) => Fixpoint::Converged {
                        version,
                        rounds: attempt.rounds,
                    },
                    Err(err) => Fixpoint::Fallback(RebuildReason::CacheCorrupt(err.to_string())),
                });
            }
            tracing::info!(round = attempt.rounds, grown, dirty = attempt.dirty.len(), "dirty set grew");
        }
        Ok(Fixpoint::Fallback(RebuildReason::RoundBudgetExceeded(max_rounds)))
    }

    /// Runs one round and returns how many files it newly dirtied.
    ///
    /// The outer result carries hard failures; the inner one cache
    /// corruption, which sends the attempt to a rebuild.
    fn run_round(
        &mut self,
        attempt: &mut Attempt<'_>,
        cancel: &CancelFlag,
    ) -> Result<Result<usize, RebuildReason>, BuildError> {
        let sources = attempt.round_sources();
        let first = attempt.rounds == 1;

        let mut previously_owned = owned_declarations(&sources, &attempt.store);
        if first {
            previously_owned.extend(owned_declarations(&attempt.request.changes.removed, &attempt.store));
        }

        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        let compiled = fingerprint_sources(&sources);
        let output = if sources.is_empty() {
            Ok(CompileOutput::default())
        } else {
            let request = CompileRequest {
                sources: &sources,
                libraries: &attempt.request.libraries,
                cache: Some(&attempt.store),
            };
            self.frontend.compile(&request)
        };
        // A front-end failure caused by an unreadable artifact is the cache's fault.
        if let Some(fault) = attempt.store.take_read_fault() {
            tracing::info!(%fault, "cache unreadable during round");
            return Ok(Err(RebuildReason::CacheCorrupt(fault)));
        }
        let output = output.map_err(compile_failure)?;
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let mut report = match attempt.store.compare_and_update(&compiled, &output) {
            Ok(report) => report,
            Err(err) => return Ok(Err(RebuildReason::CacheCorrupt(err.to_string()))),
        };
        if first {
            attempt.store.retire_sources(&attempt.request.changes.removed);
        }
        let gone = detect_removed(&previously_owned, &output);
        if !gone.is_empty() {
            tracing::debug!(count = gone.len(), "declarations removed");
        }
        report.merge(attempt.store.clear_for_removed(&gone));

        attempt.public.extend(&report.public);
        let grown = attempt.dirty.add_dirty_data(&report.all, attempt.store.index());
        tracing::info!(
            round = attempt.rounds,
            compiled = sources.len(),
            changed_symbols = report.all.lookup_symbols.len(),
            changed_names = report.all.fq_names.len(),
            "round complete"
        );
        Ok(Ok(grown))
    }

    fn rebuild(
        &mut self,
        request: &BuildRequest,
        classpath: Vec<LibraryFingerprint>,
        reason: RebuildReason,
        cancel: &CancelFlag,
    ) -> Result<BuildOutcome, BuildError> {
        tracing::info!(%reason, "performing full rebuild");
        let mut store = CacheStore::fresh(&self.cache_dir, &self.tool_version);

        let mut sources: Vec<PathBuf> = request
            .sources
            .iter()
            .filter(|p| has_source_extension(p, &self.settings.source_extensions))
            .cloned()
            .collect();
        sources.sort();
        sources.dedup();

        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        let compiled = fingerprint_sources(&sources);
        let output = if sources.is_empty() {
            CompileOutput::default()
        } else {
            let compile = CompileRequest {
                sources: &sources,
                libraries: &request.libraries,
                cache: None,
            };
            self.frontend.compile(&compile).map_err(compile_failure)?
        };
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        store.compare_and_update(&compiled, &output)?;
        let diff = BuildDiff {
            ts: request.started_at_ms,
            is_incremental: false,
            dirty: DirtyData::default(),
        };
        let version = store.commit(
            request.started_at_ms,
            classpath,
            diff,
            self.settings.build_diffs_kept,
        )?;
        tracing::info!(version, compiled = sources.len(), "full rebuild committed");
        Ok(BuildOutcome::Rebuilt {
            version,
            reason,
            compiled: sources.len(),
        })
    }
}

/// Hashes sources before they are compiled, so an edit made during the
/// compile shows up as a change next time.
fn fingerprint_sources(sources: &[PathBuf]) -> Vec<CompiledSource> {
    sources
        .iter()
        .map(|path| CompiledSource {
            path: path.clone(),
            fingerprint: SourceHasher::hash_file(path).ok(),
        })
        .collect()
}

fn compile_failure(failure: CompileFailure) -> BuildError {
    tracing::info!(diagnostics = failure.diagnostics.len(), "compilation failed");
    BuildError::CompileFailure {
        diagnostics: failure.diagnostics,
    }
}
