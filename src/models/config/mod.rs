mod database;
mod inventory;
mod runner;
mod ssh;

pub use database::*;
pub use inventory::*;
pub use runner::*;
pub use ssh::*;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::debug;

pub const CONFIG_ENV: &str = "FLEET_RUNNER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fleet-runner/config.toml";

/// Top-level application configuration.
///
/// - `[database]`  → `DatabaseConfig`
/// - `[inventory]` → `InventoryConfig`
/// - `[ssh]`       → `SshConfig`
/// - `[runner]`    → `RunnerConfig`
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FleetConfig {
    pub database: DatabaseConfig,
    pub inventory: InventoryConfig,
    pub ssh: SshConfig,
    pub runner: RunnerConfig,
}

impl FleetConfig {
    /// Loads from `$FLEET_RUNNER_CONFIG` (or the default path) plus
    /// `FLEET_RUNNER__*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        debug!("{} => {}", CONFIG_ENV, config_path);
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`FleetConfig::load`] but with an explicit file path.
    /// A missing file is not an error; every section has defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("FLEET_RUNNER").separator("__"))
            .build()
            .context("loading configuration")?;

        settings
            .try_deserialize::<Self>()
            .context("parsing configuration")
    }
}
