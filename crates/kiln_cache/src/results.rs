//! What a compile round hands to the cache.

use std::collections::BTreeMap;
use std::path::PathBuf;

use kiln_common::{ContentHash, FqName, LookupSymbol};
use serde::{Deserialize, Serialize};

/// Whether a declaration is part of the module's public API.
///
/// Only public changes are recorded in the build diff that downstream
/// modules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible to other modules.
    Public,
    /// Visible only inside this module.
    Internal,
}

/// One declaration produced by the front-end.
#[derive(Debug, Clone)]
pub struct ProducedDeclaration {
    /// Fully-qualified name of the declaration.
    pub fq_name: FqName,
    /// The source file the declaration was compiled from.
    pub source: PathBuf,
    /// Serialized compiled form.
    pub artifact: Vec<u8>,
    /// Fingerprint of the declaration's own signature (supertypes,
    /// modifiers, type parameters), excluding members.
    pub shape: ContentHash,
    /// Fingerprint of each member's signature, keyed by the member's symbol.
    pub members: BTreeMap<LookupSymbol, ContentHash>,
    /// Symbols the declaration looked up while being compiled.
    pub lookups: Vec<LookupSymbol>,
    /// Declarations this one depends on by name (supertypes, direct references).
    pub depends_on: Vec<FqName>,
    /// API visibility.
    pub visibility: Visibility,
}

/// Everything one front-end invocation produced.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Produced declarations, in any order.
    pub declarations: Vec<ProducedDeclaration>,
    /// Whole-module header metadata, when the front-end emits one.
    pub header: Option<Vec<u8>>,
}

/// A source file that was part of a compile round, with its fingerprint at
/// the time it was compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    /// The source path.
    pub path: PathBuf,
    /// Content hash, or `None` if the file could not be read for hashing.
    pub fingerprint: Option<ContentHash>,
}
