//! Incremental compilation cache management.
//!
//! This crate owns everything the decision engine persists between builds:
//! the build history (snapshot of the last successful build plus recent
//! API diffs), the per-declaration artifact table, the reverse index from
//! symbols and names to the files that own or use them, and the global
//! module header. All of it is committed together by swapping a generation
//! pointer, so a crash mid-write never exposes a half-updated cache.

#![warn(missing_docs)]

pub mod artifact;
pub mod changes;
pub mod error;
pub mod frame;
pub mod fs;
pub mod hasher;
pub mod history;
pub mod index;
pub mod layout;
pub mod results;
pub mod store;

pub use artifact::ArtifactStore;
pub use changes::{ChangeReport, DirtyData};
pub use error::CacheError;
pub use hasher::{ChangeSet, LibraryFingerprint, SourceHasher};
pub use history::{BuildDiff, BuildHistory, BuildSnapshot};
pub use index::{FileId, ReverseIndex};
pub use layout::CacheLayout;
pub use results::{CompileOutput, CompiledSource, ProducedDeclaration, Visibility};
pub use store::{ArtifactProvider, CacheEntry, CacheStore};
