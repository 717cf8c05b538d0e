//! Shared foundational types used across the Kiln incremental driver.
//!
//! This crate provides content hashing and the two naming schemes the
//! dependency tracking is built on: fully-qualified declaration names and
//! `(scope, name)` lookup symbols.

#![warn(missing_docs)]

pub mod hash;
pub mod names;

pub use hash::{ContentHash, ContentHasher};
pub use names::{FqName, LookupSymbol};
