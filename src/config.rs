// src/config.rs

//! Configuration loading utilities.
//!
//! Order of precedence, lowest first: built-in defaults, the TOML file,
//! the `.env` file, then the process environment.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Load a `.env` file into the process environment.
///
/// A missing file is not an error; returns whether a file was read.
pub fn load_env_file(path: Option<&Path>) -> Result<bool> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| true),
        None => dotenvy::dotenv().map(|_| true),
    };
    match loaded {
        Ok(found) => Ok(found),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Load configuration from a TOML file, overlaid with the environment.
///
/// Falls back to defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        log::info!("Loading configuration from {}", path.display());
        Config::load(path)?
    } else {
        log::warn!("No config file at {}, using defaults", path.display());
        Config::default()
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load the environment file and configuration, then validate.
pub fn load_all(config_path: &Path, env_file: Option<&Path>) -> Result<Config> {
    if load_env_file(env_file)? {
        log::debug!("Loaded environment file");
    }
    let config = load_config(config_path)?;
    config.validate()?;
    Ok(config)
}
