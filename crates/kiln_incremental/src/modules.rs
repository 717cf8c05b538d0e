//! Resolution of classpath libraries to the modules that produce them.

use std::path::Path;

use kiln_cache::{BuildDiff, BuildHistory};
use kiln_config::{ResolvedConfig, ResolvedModule};

/// The producing module of a library and its recent API changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Module name.
    pub module: String,
    /// The module's build diffs, oldest first, or `None` if its history
    /// cannot be read.
    pub diffs: Option<Vec<BuildDiff>>,
}

/// Looks up which module produced a library.
pub trait ModulesApiHistory {
    /// Returns the producing module of `library`, or `None` for a library
    /// built outside the project.
    fn resolve(&self, library: &Path) -> Option<ModuleRecord>;
}

/// Resolver backed by the `[modules]` configuration table.
///
/// A library belongs to a module when its path equals, or lies under, one
/// of the module's outputs. The module's diffs come from the history
/// committed in its cache directory.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredModules {
    modules: Vec<ResolvedModule>,
}

impl ConfiguredModules {
    /// Creates a resolver from the configured modules.
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            modules: config.modules.clone(),
        }
    }
}

impl ModulesApiHistory for ConfiguredModules {
    fn resolve(&self, library: &Path) -> Option<ModuleRecord> {
        let module = self
            .modules
            .iter()
            .find(|m| m.outputs.iter().any(|output| library.starts_with(output)))?;

        let diffs = match BuildHistory::load_committed(&module.cache_dir) {
            Ok(Some(history)) => Some(history.diffs),
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(
                    module = %module.name,
                    error = %err,
                    "cannot read module build history"
                );
                None
            }
        };
        Some(ModuleRecord {
            module: module.name.clone(),
            diffs,
        })
    }
}
