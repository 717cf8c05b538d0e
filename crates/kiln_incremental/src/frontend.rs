//! Contract with the language front-end.

use std::fmt;
use std::path::PathBuf;

use kiln_cache::{ArtifactProvider, CompileOutput};

/// Severity of a front-end diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A hard error.
    Error,
    /// A warning.
    Warning,
}

/// One message reported by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the message is.
    pub severity: Severity,
    /// The message text.
    pub message: String,
    /// The file the message is about, if any.
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    /// An error without a file location.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            file: None,
        }
    }

    /// Attaches a file location.
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.file {
            Some(file) => write!(f, "{}: {severity}: {}", file.display(), self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// The front-end could not compile the requested sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    /// What went wrong.
    pub diagnostics: Vec<Diagnostic>,
}

/// Input of one front-end invocation.
pub struct CompileRequest<'a> {
    /// Exactly the sources to compile, sorted and deduplicated.
    pub sources: &'a [PathBuf],
    /// The classpath.
    pub libraries: &'a [PathBuf],
    /// Cached results of the declarations not being recompiled. `None`
    /// during a full rebuild.
    pub cache: Option<&'a dyn ArtifactProvider>,
}

/// A language front-end and back-end.
///
/// The call blocks until the whole request is compiled; the front-end may
/// parallelize internally.
pub trait FrontEnd {
    /// Compiles the requested sources.
    fn compile(&mut self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure>;
}
