//! Shared fixtures for the driver scenarios: a toy front-end and an on-disk
//! project in a temporary directory.
//!
//! Toy source format, one directive per line:
//!
//! ```text
//! decl app.A public v1     starts a declaration with visibility and shape
//! member run (Int)         member signature of the current declaration
//! uses app.B run           symbol looked up by the current declaration
//! depends app.B            name the current declaration depends on
//! error message            makes the compile fail
//! # anything               body text, only affects the artifact
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use kiln_cache::{
    ArtifactProvider, CacheLayout, CacheStore, CompileOutput, ProducedDeclaration, Visibility,
};
use kiln_common::{ContentHash, FqName, LookupSymbol};
use kiln_config::ResolvedConfig;
use kiln_incremental::{
    BuildError, BuildOutcome, BuildRequest, CancelFlag, ChangedFiles, CompileFailure,
    CompileRequest, ConfiguredModules, Diagnostic, FrontEnd, IncrementalDriver,
};
use tempfile::TempDir;

pub const TOOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Toy front-end
// ---------------------------------------------------------------------------

/// Front-end compiling the toy format and recording every invocation.
#[derive(Default)]
pub struct ToyFrontEnd {
    /// Sources of each invocation, in call order.
    pub calls: Vec<Vec<PathBuf>>,
    /// Number of invocations that received a cache view.
    pub with_cache: usize,
    /// Artifacts read back through the cache view.
    pub reused: usize,
    /// Cancelled from inside the next compile call.
    pub cancel_during_compile: Option<CancelFlag>,
    /// Directory swapped for a plain file by the next compile call and
    /// restored, empty, by the call after that.
    pub obstruct: Option<PathBuf>,
}

impl FrontEnd for ToyFrontEnd {
    fn compile(&mut self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure> {
        self.calls.push(request.sources.to_vec());
        if let Some(flag) = &self.cancel_during_compile {
            flag.cancel();
        }
        if let Some(path) = self.obstruct.clone() {
            if path.is_dir() {
                std::fs::remove_dir_all(&path).unwrap();
                std::fs::write(&path, b"in the way").unwrap();
            } else {
                std::fs::remove_file(&path).unwrap();
                self.obstruct = None;
            }
        }

        let mut output = CompileOutput::default();
        let mut diagnostics = Vec::new();
        for path in request.sources {
            let text = std::fs::read_to_string(path).map_err(|e| CompileFailure {
                diagnostics: vec![Diagnostic::error(e.to_string()).in_file(path)],
            })?;
            parse(path, &text, &mut output.declarations, &mut diagnostics);
        }
        if !diagnostics.is_empty() {
            return Err(CompileFailure { diagnostics });
        }

        if let Some(cache) = request.cache {
            self.with_cache += 1;
            // Reuse the cached artifact of every name the compiled code references.
            let referenced: Vec<FqName> = output
                .declarations
                .iter()
                .flat_map(|d| d.depends_on.iter().cloned())
                .collect();
            for fq_name in referenced {
                if let Ok(Some(_)) = cache.read_artifact(&fq_name) {
                    self.reused += 1;
                }
            }
        }
        Ok(output)
    }
}

fn parse(
    path: &Path,
    text: &str,
    out: &mut Vec<ProducedDeclaration>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut current: Option<ProducedDeclaration> = None;
    for line in text.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["decl", fq, visibility, shape] => {
                out.extend(current.take());
                current = Some(ProducedDeclaration {
                    fq_name: FqName::new(*fq),
                    source: path.to_path_buf(),
                    artifact: Vec::new(),
                    shape: ContentHash::from_bytes(shape.as_bytes()),
                    members: Default::default(),
                    lookups: Vec::new(),
                    depends_on: Vec::new(),
                    visibility: if *visibility == "internal" {
                        Visibility::Internal
                    } else {
                        Visibility::Public
                    },
                });
            }
            ["member", name, signature] => {
                if let Some(decl) = current.as_mut() {
                    let symbol = decl.fq_name.member(name);
                    decl.members
                        .insert(symbol, ContentHash::from_bytes(signature.as_bytes()));
                }
            }
            ["uses", scope, name] => {
                if let Some(decl) = current.as_mut() {
                    decl.lookups.push(LookupSymbol::new(*scope, *name));
                }
            }
            ["depends", fq] => {
                if let Some(decl) = current.as_mut() {
                    decl.depends_on.push(FqName::new(*fq));
                }
            }
            ["error", ..] => diagnostics.push(Diagnostic::error(line).in_file(path)),
            _ => {}
        }
        if let Some(decl) = current.as_mut() {
            decl.artifact.extend_from_slice(line.as_bytes());
            decl.artifact.push(b'\n');
        }
    }
    out.extend(current);
}

// ---------------------------------------------------------------------------
// On-disk project
// ---------------------------------------------------------------------------

/// Result of one build attempt.
pub struct Run {
    pub result: Result<BuildOutcome, BuildError>,
    pub calls: Vec<Vec<PathBuf>>,
    pub with_cache: usize,
    pub reused: usize,
}

impl Run {
    pub fn outcome(&self) -> &BuildOutcome {
        match &self.result {
            Ok(outcome) => outcome,
            Err(err) => panic!("build failed: {err}"),
        }
    }

    /// Sources compiled in each round, as file names.
    pub fn rounds(&self) -> Vec<Vec<String>> {
        self.calls
            .iter()
            .map(|call| {
                call.iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect()
            })
            .collect()
    }
}

/// A module with its sources under `src/` in a temporary directory.
pub struct Project {
    dir: TempDir,
    pub config: ResolvedConfig,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let config = ResolvedConfig::for_project(dir.path());
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn src(&self, name: &str) -> PathBuf {
        self.root().join("src").join(name)
    }

    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.src(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    pub fn remove(&self, name: &str) -> PathBuf {
        let path = self.src(name);
        std::fs::remove_file(&path).unwrap();
        path
    }

    /// Every file under `src/`, sorted.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.root().join("src"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    pub fn driver(&self) -> IncrementalDriver<ToyFrontEnd, ConfiguredModules> {
        IncrementalDriver::new(
            &self.config,
            TOOL_VERSION,
            ToyFrontEnd::default(),
            ConfiguredModules::new(&self.config),
        )
    }

    /// Builds with explicitly reported changes.
    pub fn build(&self, modified: &[&str], removed: &[&str], libraries: &[PathBuf], ts: u64) -> Run {
        let changes = ChangedFiles::new(
            modified.iter().map(|n| self.src(n)).collect(),
            removed.iter().map(|n| self.src(n)).collect(),
        );
        self.run(self.driver(), changes, libraries, ts, &CancelFlag::new())
    }

    /// Builds with changes detected from the cached fingerprints.
    pub fn build_detected(&self, libraries: &[PathBuf], ts: u64) -> Run {
        let driver = self.driver();
        let changes = driver.detect_changes(&self.sources());
        self.run(driver, changes, libraries, ts, &CancelFlag::new())
    }

    pub fn run(
        &self,
        mut driver: IncrementalDriver<ToyFrontEnd, ConfiguredModules>,
        changes: ChangedFiles,
        libraries: &[PathBuf],
        ts: u64,
        cancel: &CancelFlag,
    ) -> Run {
        let request = BuildRequest::new(self.sources(), changes, libraries.to_vec()).started_at(ts);
        let result = driver.build(&request, cancel);
        let frontend = driver.frontend();
        Run {
            result,
            calls: frontend.calls.clone(),
            with_cache: frontend.with_cache,
            reused: frontend.reused,
        }
    }

    /// The committed generation of the module cache.
    pub fn generation(&self) -> Option<u64> {
        CacheLayout::new(&self.config.cache_dir)
            .current_generation()
            .unwrap()
    }

    pub fn store(&self) -> CacheStore {
        CacheStore::open(&self.config.cache_dir, TOOL_VERSION).unwrap()
    }
}
