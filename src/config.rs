use crate::models::config::FleetConfig;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

pub fn debug_print_config(cfg: &FleetConfig) {
    debug!("🔧 Loaded Configuration:");

    let db = &cfg.database;
    debug!("  [database]");
    debug!("    host = {}", db.host);
    debug!("    port = {}", db.port);
    debug!("    user = {}", db.user);
    debug!("    password = {}", mask(&db.password));
    debug!("    name = {}", db.name.as_deref().unwrap_or("<none>"));
    debug!("    client = {:?} ({})", db.client, db.client_binary);

    let inv = &cfg.inventory;
    debug!("  [inventory]");
    debug!("    table = {}", inv.table);
    debug!("    user_column = {}", inv.user_column);
    debug!("    host_column = {}", inv.host_column);
    if let Some(clause) = &inv.where_clause {
        debug!("    where_clause = {}", clause);
    }

    let ssh = &cfg.ssh;
    debug!("  [ssh]");
    debug!("    binary = {}", ssh.binary);
    if let Some(key) = &ssh.identity_file {
        debug!("    identity_file = {}", key.display());
    }
    debug!("    connect_timeout = {:?}", ssh.connect_timeout);
    debug!("    strict_host_key_checking = {}", ssh.strict_host_key_checking);

    debug!("  [runner]");
    debug!("    mode = {}", cfg.runner.execution_mode());
    debug!("    command_timeout = {:?}", cfg.runner.command_timeout);
}

/// Loads configuration from `path` when given, otherwise from the
/// environment-selected location.
pub fn load_config(path: Option<&Path>) -> Result<FleetConfig> {
    let cfg = match path {
        Some(path) => FleetConfig::load_from(path)?,
        None => FleetConfig::load()?,
    };
    debug_print_config(&cfg);
    Ok(cfg)
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}
