use serde::Deserialize;

/// Where host inventory lives in the database.
///
/// This section is loaded from `[inventory]` in `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// `table` or `schema.table`
    pub table: String,
    pub user_column: String,
    pub host_column: String,
    pub where_clause: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            table: "hosts".to_string(),
            user_column: "ssh_user".to_string(),
            host_column: "hostname".to_string(),
            where_clause: None,
        }
    }
}
