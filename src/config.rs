use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Application configuration. The database path may come from the TOML file
/// or be overridden with the `DATABASE_PATH` environment variable.
#[derive(Deserialize, Debug)]
pub struct AppConfig {
    pub database_path: String,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref)
        .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path_ref, e)))?;
    let app_config: AppConfig = toml::from_str(&contents).map_err(|e| {
        Error::Config(format!(
            "Failed to parse TOML from config file {:?}: {}",
            path_ref, e
        ))
    })?;
    Ok(app_config)
}

/// Resolves configuration: `DATABASE_PATH` env var wins, then the TOML file
/// named by `CONFIG_PATH` (default `config.toml`), then a local default.
pub fn load_app_configuration() -> Result<AppConfig> {
    if let Ok(database_path) = env::var("DATABASE_PATH") {
        tracing::info!("Using database path from DATABASE_PATH env var.");
        return Ok(AppConfig { database_path });
    }

    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    match load_config(&config_path) {
        Ok(cfg) => Ok(cfg),
        Err(Error::Config(msg)) if msg.contains("Failed to read") => {
            tracing::warn!(
                "No config file at '{}'; falling back to ./coach-ledger.db",
                config_path
            );
            Ok(AppConfig {
                database_path: "coach-ledger.db".to_string(),
            })
        }
        Err(e) => Err(e),
    }
}
