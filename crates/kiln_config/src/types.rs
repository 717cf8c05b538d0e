//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default number of compile rounds before the fixpoint driver gives up.
pub const DEFAULT_MAX_ROUNDS: u32 = 8;

/// Default number of build diffs retained in the build history.
pub const DEFAULT_BUILD_DIFFS_KEPT: usize = 10;

/// Default cache directory, relative to the project directory.
pub const DEFAULT_CACHE_DIR: &str = ".kiln-cache";

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverConfig {
    /// Incremental compilation settings.
    #[serde(default)]
    pub incremental: IncrementalConfig,
    /// On-disk cache location.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Modules whose build outputs appear on this module's classpath,
    /// keyed by module name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// Settings for the incremental decision engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IncrementalConfig {
    /// When `false`, every attempt is a full rebuild.
    pub enabled: bool,
    /// Hard budget of compile rounds per attempt.
    pub max_rounds: u32,
    /// How many recent build diffs the history keeps for downstream modules.
    pub build_diffs_kept: usize,
    /// File extensions (without the dot) that count as sources. Empty means
    /// every file does.
    pub source_extensions: Vec<String>,
    /// Wall-clock limit for one attempt, in seconds.
    pub attempt_timeout_secs: Option<u64>,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rounds: DEFAULT_MAX_ROUNDS,
            build_diffs_kept: DEFAULT_BUILD_DIFFS_KEPT,
            source_extensions: Vec::new(),
            attempt_timeout_secs: None,
        }
    }
}

/// Cache directory configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory, relative to the project directory unless absolute.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// A module that produces libraries consumed by this build.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Library paths (files or directories) the module produces.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// The module's own Kiln cache directory, holding its build history.
    pub cache_dir: PathBuf,
}
