//! Path resolution: anchoring relative configuration paths at the project directory.

use crate::error::ConfigError;
use crate::types::{DriverConfig, IncrementalConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A configuration with every path made absolute relative to the project.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The project directory all relative paths were resolved against.
    pub project_dir: PathBuf,
    /// The cache directory of this module.
    pub cache_dir: PathBuf,
    /// Incremental compilation settings.
    pub incremental: IncrementalConfig,
    /// Producing modules of classpath libraries.
    pub modules: Vec<ResolvedModule>,
}

/// A producing module with resolved output and cache paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// The module name from `[modules.<name>]`.
    pub name: String,
    /// Library paths the module produces.
    pub outputs: Vec<PathBuf>,
    /// The module's cache directory.
    pub cache_dir: PathBuf,
}

/// Resolves all relative paths in `config` against `project_dir`.
///
/// Fails if two modules claim the same output, since the producing module
/// of that library would be ambiguous.
pub fn resolve_paths(
    config: &DriverConfig,
    project_dir: &Path,
) -> Result<ResolvedConfig, ConfigError> {
    let anchor = |p: &Path| -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            project_dir.join(p)
        }
    };

    let mut claimed: BTreeMap<PathBuf, &str> = BTreeMap::new();
    let mut modules = Vec::with_capacity(config.modules.len());
    for (name, module) in &config.modules {
        let outputs: Vec<PathBuf> = module.outputs.iter().map(|p| anchor(p)).collect();
        for output in &outputs {
            if let Some(other) = claimed.insert(output.clone(), name) {
                return Err(ConfigError::ValidationError(format!(
                    "output {} is claimed by modules '{other}' and '{name}'",
                    output.display()
                )));
            }
        }
        modules.push(ResolvedModule {
            name: name.clone(),
            outputs,
            cache_dir: anchor(&module.cache_dir),
        });
    }

    Ok(ResolvedConfig {
        project_dir: project_dir.to_path_buf(),
        cache_dir: anchor(&config.cache.dir),
        incremental: config.incremental.clone(),
        modules,
    })
}

impl ResolvedConfig {
    /// The default configuration rooted at `project_dir`.
    pub fn for_project(project_dir: &Path) -> Self {
        let config = DriverConfig::default();
        Self {
            project_dir: project_dir.to_path_buf(),
            cache_dir: project_dir.join(&config.cache.dir),
            incremental: config.incremental,
            modules: Vec::new(),
        }
    }
}
