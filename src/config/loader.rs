//! Configuration loading and discovery for `tileforge.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::ForgeConfig;
use crate::palette::SimilarityMode;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "tileforge.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse tileforge.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override template directory
    pub templates: Option<PathBuf>,
    /// Override worker count
    pub jobs: Option<usize>,
    /// Override similarity mode
    pub similarity: Option<SimilarityMode>,
    /// Override color conversion
    pub color_conversion: Option<bool>,
}

/// Find tileforge.toml by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a tileforge.toml file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find tileforge.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        // Move to parent directory
        if !current.pop() {
            // Reached root, no config found
            return None;
        }
    }
}

/// Load configuration from a tileforge.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// Relative template directories are resolved against the config file's
/// directory.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("game/tileforge.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<ForgeConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(ForgeConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<ForgeConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: ForgeConfig = toml::from_str(&contents)?;

    // Validate the config
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    if let Some(root) = path.parent() {
        config.templates.dir = resolve_path(root, &config.templates.dir);
    }
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut ForgeConfig, overrides: &CliOverrides) {
    if let Some(ref templates) = overrides.templates {
        config.templates.dir = templates.clone();
    }
    if let Some(jobs) = overrides.jobs {
        config.matching.jobs = jobs;
    }
    if let Some(similarity) = overrides.similarity {
        config.matching.similarity = similarity;
    }
    if let Some(color_conversion) = overrides.color_conversion {
        config.matching.color_conversion = color_conversion;
    }
}

/// Resolve a path relative to the config directory.
///
/// If the path is absolute, returns it unchanged.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
