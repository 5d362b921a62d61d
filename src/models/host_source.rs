use crate::error::{FleetError, Result};
use crate::models::config::InventoryConfig;
use std::path::PathBuf;

/// Where the fleet for one run comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSource {
    /// Whitespace-separated `user@host` tokens, possibly several per string.
    Manual(Vec<String>),
    /// An inventory file, one `user@host` per line.
    File(PathBuf),
    /// A SELECT against the inventory table.
    Query(InventoryQuery),
}

impl HostSource {
    pub fn describe(&self) -> String {
        match self {
            HostSource::Manual(raw) => format!("manual list ({} entries)", raw.len()),
            HostSource::File(path) => format!("file {}", path.display()),
            HostSource::Query(q) => format!("database table {}", q.table),
        }
    }
}

/// The inventory lookup: `SELECT CONCAT(user, '@', host) FROM table [WHERE ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryQuery {
    pub table: String,
    pub user_column: String,
    pub host_column: String,
    /// Raw SQL condition, appended verbatim after `WHERE`.
    pub where_clause: Option<String>,
}

impl InventoryQuery {
    pub fn from_config(cfg: &InventoryConfig) -> Self {
        Self {
            table: cfg.table.clone(),
            user_column: cfg.user_column.clone(),
            host_column: cfg.host_column.clone(),
            where_clause: cfg.where_clause.clone(),
        }
    }

    pub fn with_where(mut self, clause: Option<String>) -> Self {
        if clause.is_some() {
            self.where_clause = clause;
        }
        self
    }

    pub fn to_sql(&self) -> Result<String> {
        let mut sql = format!(
            "SELECT CONCAT({}, '@', {}) FROM {}",
            quote_identifier(&self.user_column)?,
            quote_identifier(&self.host_column)?,
            quote_table(&self.table)?
        );
        if let Some(clause) = self
            .where_clause
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        Ok(sql)
    }
}

/// Backtick-quotes a MariaDB identifier.
pub fn quote_identifier(ident: &str) -> Result<String> {
    if ident.is_empty() || ident.chars().count() > 64 || ident.contains('\0') {
        return Err(FleetError::InvalidIdentifier(ident.to_string()));
    }
    Ok(format!("`{}`", ident.replace('`', "``")))
}

/// Quotes `table` or `schema.table`.
pub fn quote_table(name: &str) -> Result<String> {
    match name.split_once('.') {
        Some((schema, table)) => Ok(format!(
            "{}.{}",
            quote_identifier(schema)?,
            quote_identifier(table)?
        )),
        None => quote_identifier(name),
    }
}

/// Single-quotes a string literal, escaping backslashes and quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
