//! Build outcomes, rebuild reasons and hard errors.

use std::fmt;

use kiln_cache::CacheError;
use kiln_common::FqName;

use crate::frontend::Diagnostic;

/// Why an attempt fell back to a full rebuild.
///
/// These are not errors: a rebuild is a successful, merely slower, outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// Incremental compilation is switched off in the configuration.
    Disabled,
    /// No previous successful build was recorded.
    NoHistory,
    /// The build history exists but cannot be used.
    HistoryUnreadable(String),
    /// Classpath changes could not be attributed to specific symbols.
    ClasspathAmbiguous(String),
    /// Reading or writing the cache failed during an incremental attempt.
    CacheCorrupt(String),
    /// The fixpoint loop did not converge within the round budget.
    RoundBudgetExceeded(u32),
    /// A declaration of a removed file has no cache entry.
    RemovedDeclarationUnresolved(FqName),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "Incremental compilation is disabled"),
            Self::NoHistory => write!(f, "No information on previous build"),
            Self::HistoryUnreadable(reason) => {
                write!(f, "Previous build history is unreadable: {reason}")
            }
            Self::ClasspathAmbiguous(reason) => {
                write!(f, "Classpath changes cannot be resolved: {reason}")
            }
            Self::CacheCorrupt(reason) => write!(f, "Cache is corrupt: {reason}"),
            Self::RoundBudgetExceeded(rounds) => {
                write!(f, "No fixpoint reached after {rounds} rounds")
            }
            Self::RemovedDeclarationUnresolved(fq_name) => {
                write!(f, "Cannot resolve removed declaration {fq_name}")
            }
        }
    }
}

/// How a successful attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The incremental fixpoint converged.
    Converged {
        /// Version marker of the committed build.
        version: u64,
        /// Number of rounds run.
        rounds: u32,
    },
    /// Every source was recompiled from scratch.
    Rebuilt {
        /// Version marker of the committed build.
        version: u64,
        /// Why the rebuild happened.
        reason: RebuildReason,
        /// Number of sources compiled.
        compiled: usize,
    },
}

impl BuildOutcome {
    /// Version marker of the committed build.
    pub fn version(&self) -> u64 {
        match self {
            Self::Converged { version, .. } | Self::Rebuilt { version, .. } => *version,
        }
    }
}

/// Hard failures of a build attempt. The previous cache stays in effect.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The front-end reported errors.
    #[error("compilation failed with {} diagnostic(s)", diagnostics.len())]
    CompileFailure {
        /// Diagnostics reported by the front-end.
        diagnostics: Vec<Diagnostic>,
    },

    /// The attempt was cancelled or ran past its deadline.
    #[error("build attempt was cancelled")]
    Cancelled,

    /// A full rebuild could not persist its cache.
    #[error("cannot write cache: {0}")]
    Cache(#[from] CacheError),
}
