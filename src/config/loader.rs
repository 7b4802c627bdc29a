//! Configuration loading and discovery for `frontpipe.toml`
//!
//! Provides functions to find, load, and resolve configuration.

use super::schema::FrontpipeConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "frontpipe.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse frontpipe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A loaded configuration together with the directory it applies to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed configuration
    pub config: FrontpipeConfig,
    /// Project root (directory containing frontpipe.toml, or the working directory)
    pub project_root: PathBuf,
    /// Path of the file that was loaded, if any
    pub source: Option<PathBuf>,
}

/// Find frontpipe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find frontpipe.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a frontpipe.toml file.
///
/// An explicit `path` must exist. Without one, the file is discovered with
/// [`find_config`]; when nothing is found the defaults apply and the working
/// directory becomes the project root.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            let project_root = match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => env::current_dir()?,
            };
            Ok(LoadedConfig { config, project_root, source: Some(p) })
        }
        None => Ok(LoadedConfig {
            config: default_config(),
            project_root: env::current_dir()?,
            source: None,
        }),
    }
}

/// Load configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<FrontpipeConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: FrontpipeConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no frontpipe.toml is found.
///
/// The project name is taken from the current directory name.
pub fn default_config() -> FrontpipeConfig {
    let mut config = FrontpipeConfig::default();
    if let Some(name) = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        config.project.name = name;
    }
    config
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
