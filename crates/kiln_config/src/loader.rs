//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::DriverConfig;
use std::path::Path;

/// Name of the configuration file within the project directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// A project without a `kiln.toml` gets the default configuration.
pub fn load_config(project_dir: &Path) -> Result<DriverConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(DriverConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<DriverConfig, ConfigError> {
    let config: DriverConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.incremental.max_rounds == 0 {
        return Err(ConfigError::ValidationError(
            "incremental.max_rounds must be at least 1".to_string(),
        ));
    }
    if config.incremental.build_diffs_kept == 0 {
        return Err(ConfigError::ValidationError(
            "incremental.build_diffs_kept must be at least 1".to_string(),
        ));
    }
    if config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("cache.dir".to_string()));
    }
    for (name, module) in &config.modules {
        if module.outputs.is_empty() {
            return Err(ConfigError::MissingField(format!("modules.{name}.outputs")));
        }
        if module.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "modules.{name}.cache_dir"
            )));
        }
    }
    Ok(())
}
