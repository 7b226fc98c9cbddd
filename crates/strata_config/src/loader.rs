//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates `<project_dir>/strata.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and that every module edge names a declared module.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    for (name, module) in &config.modules {
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "module names must not be empty".to_string(),
            ));
        }
        let edges = module
            .dependencies
            .iter()
            .chain(&module.depends_on)
            .chain(&module.friends);
        for target in edges {
            if !config.modules.contains_key(target) {
                return Err(ConfigError::ValidationError(format!(
                    "module '{name}' depends on unknown module '{target}'"
                )));
            }
            if target == name {
                return Err(ConfigError::ValidationError(format!(
                    "module '{name}' depends on itself"
                )));
            }
        }
    }
    Ok(())
}
