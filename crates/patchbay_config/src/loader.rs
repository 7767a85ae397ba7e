//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::RouterConfig;
use std::collections::HashSet;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "patchbay.toml";

/// Loads and validates `patchbay.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<RouterConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &RouterConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }
    if config.fabric.chains.is_empty() {
        return Err(ConfigError::MissingField("fabric.chains"));
    }

    let mut seen = HashSet::new();
    for block in &config.fabric.blocks {
        if block.label.is_empty() || block.adjacency.is_empty() {
            return Err(ConfigError::MissingField("fabric.blocks.label/adjacency"));
        }
        if !seen.insert(block.label.as_str()) {
            return Err(ConfigError::DuplicateBlock(block.label.clone()));
        }
    }
    for reserved in &config.fabric.reserved {
        if !seen.contains(reserved.block.as_str()) {
            return Err(ConfigError::UndeclaredReservedBlock {
                block: reserved.block.clone(),
                key: reserved.key,
            });
        }
    }

    let search = &config.search;
    let at_least_one = [
        ("search.max_attempts", search.max_attempts != 0),
        ("search.reinforcement_period", search.reinforcement_period != 0),
        ("search.threads", search.threads != Some(0)),
    ];
    for (field, ok) in at_least_one {
        if !ok {
            return Err(ConfigError::TooSmall { field, minimum: 1 });
        }
    }
    Ok(())
}
