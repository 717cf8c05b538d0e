//! Incremental compilation decision engine.
//!
//! Given the changed sources and the current classpath of a module, the
//! [`IncrementalDriver`] decides whether a full rebuild is needed or which
//! files must be recompiled, drives the front-end through rounds until the
//! set of affected files stops growing, and commits the cache atomically.
//!
//! The language front-end and the lookup of upstream module histories are
//! collaborators behind the [`FrontEnd`] and [`ModulesApiHistory`] traits.

#![warn(missing_docs)]

pub mod cancel;
pub mod classpath;
pub mod dirty;
pub mod driver;
pub mod error;
pub mod frontend;
pub mod mode;
pub mod modules;
pub mod removed;
pub mod request;

pub use cancel::CancelFlag;
pub use classpath::{classpath_changes, ClasspathChanges};
pub use dirty::DirtySet;
pub use driver::IncrementalDriver;
pub use error::{BuildError, BuildOutcome, RebuildReason};
pub use frontend::{CompileFailure, CompileRequest, Diagnostic, FrontEnd, Severity};
pub use mode::{decide, CompilationMode};
pub use modules::{ConfiguredModules, ModuleRecord, ModulesApiHistory};
pub use request::{BuildRequest, ChangedFiles};
