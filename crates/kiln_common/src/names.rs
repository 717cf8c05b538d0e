//! Declaration names and usage symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified name of a declaration, e.g. `com.example.Widget`.
///
/// Segments are separated by `.`. The empty string is the root scope.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FqName(String);

impl FqName {
    /// Creates a name from its dotted string form.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the dotted string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the enclosing scope (`com.example` for `com.example.Widget`).
    pub fn parent(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Returns the last segment (`Widget` for `com.example.Widget`).
    pub fn short_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The symbol under which this declaration is looked up from its scope.
    pub fn own_symbol(&self) -> LookupSymbol {
        LookupSymbol::new(self.parent(), self.short_name())
    }

    /// Returns a symbol for a member `name` scoped inside this declaration.
    pub fn member(&self, name: &str) -> LookupSymbol {
        LookupSymbol::new(self.0.as_str(), name)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FqName({})", self.0)
    }
}

impl From<&str> for FqName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A usage dependency: some code looked up `name` within `scope`.
///
/// When the declaration behind a symbol changes shape, every file that
/// recorded the lookup must be recompiled.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LookupSymbol {
    /// The scope the lookup happened in (package or enclosing declaration).
    pub scope: String,
    /// The simple name that was looked up.
    pub name: String,
}

impl LookupSymbol {
    /// Creates a symbol from its scope and simple name.
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LookupSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}::{}", self.scope, self.name)
        }
    }
}

impl fmt::Debug for LookupSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupSymbol({self})")
    }
}
