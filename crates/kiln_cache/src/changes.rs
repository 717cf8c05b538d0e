//! Symbol- and name-level change sets.

use std::collections::BTreeSet;

use kiln_common::{FqName, LookupSymbol};
use serde::{Deserialize, Serialize};

use crate::results::Visibility;

/// A set of lookup symbols and declaration names that must be treated as
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyData {
    /// Changed usage symbols.
    pub lookup_symbols: BTreeSet<LookupSymbol>,
    /// Changed declaration names.
    pub fq_names: BTreeSet<FqName>,
}

impl DirtyData {
    /// Returns `true` if nothing is dirty.
    pub fn is_empty(&self) -> bool {
        self.lookup_symbols.is_empty() && self.fq_names.is_empty()
    }

    /// Adds everything in `other` to `self`.
    pub fn extend(&mut self, other: &DirtyData) {
        self.lookup_symbols
            .extend(other.lookup_symbols.iter().cloned());
        self.fq_names.extend(other.fq_names.iter().cloned());
    }
}

/// Output of a cache diff: what changed relative to the previous cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    /// Every changed, added or removed symbol and name.
    pub all: DirtyData,
    /// The subset contributed by public declarations.
    pub public: DirtyData,
    /// Declarations confirmed removed.
    pub removed: BTreeSet<FqName>,
}

impl ChangeReport {
    /// Returns `true` if the report carries no change at all.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.removed.is_empty()
    }

    /// Records a change of the declaration's own signature.
    pub fn record_signature(&mut self, fq_name: &FqName, visibility: Visibility) {
        self.record_name(fq_name, visibility);
        self.record_symbol(fq_name.own_symbol(), visibility);
    }

    /// Records a change of one member symbol.
    pub fn record_symbol(&mut self, symbol: LookupSymbol, visibility: Visibility) {
        if visibility == Visibility::Public {
            self.public.lookup_symbols.insert(symbol.clone());
        }
        self.all.lookup_symbols.insert(symbol);
    }

    fn record_name(&mut self, fq_name: &FqName, visibility: Visibility) {
        if visibility == Visibility::Public {
            self.public.fq_names.insert(fq_name.clone());
        }
        self.all.fq_names.insert(fq_name.clone());
    }

    /// Records that `fq_name` is gone.
    pub fn record_removed(&mut self, fq_name: &FqName, visibility: Visibility) {
        self.record_signature(fq_name, visibility);
        self.removed.insert(fq_name.clone());
    }

    /// Merges `other` into `self`.
    pub fn merge(&mut self, other: ChangeReport) {
        self.all.extend(&other.all);
        self.public.extend(&other.public);
        self.removed.extend(other.removed);
    }
}
