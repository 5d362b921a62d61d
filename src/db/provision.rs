use crate::db::SqlClient;
use crate::error::{FleetError, Result};
use crate::models::host_source::{quote_identifier, quote_literal, quote_table};
use crate::models::target::Target;
use tracing::info;

/// One-time database setup: schema, inventory table, application user and
/// its grants.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub database: String,
    pub table: String,
    pub user_column: String,
    pub host_column: String,
    pub app_user: String,
    pub app_password: String,
    /// MariaDB account host part, `%` for any
    pub app_host: String,
    pub privileges: Vec<String>,
}

impl ProvisionPlan {
    pub fn default_privileges() -> Vec<String> {
        ["SELECT", "INSERT", "UPDATE", "DELETE"]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    /// Statements in execution order. Every step is idempotent so the plan
    /// can be re-run to rotate the application password.
    pub fn statements(&self) -> Result<Vec<String>> {
        let db = quote_identifier(&self.database)?;
        let table = format!("{}.{}", db, quote_identifier(&self.table)?);
        let user_col = quote_identifier(&self.user_column)?;
        let host_col = quote_identifier(&self.host_column)?;
        let account = format!(
            "{}@{}",
            quote_literal(&self.app_user),
            quote_literal(&self.app_host)
        );
        let password = quote_literal(&self.app_password);
        let privileges = self.validated_privileges()?;

        Ok(vec![
            format!("CREATE DATABASE IF NOT EXISTS {}", db),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 `id` INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                 {} VARCHAR(64) NOT NULL, \
                 {} VARCHAR(255) NOT NULL, \
                 `description` VARCHAR(255) NULL, \
                 `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
                table, user_col, host_col
            ),
            format!("CREATE USER IF NOT EXISTS {} IDENTIFIED BY {}", account, password),
            format!("ALTER USER {} IDENTIFIED BY {}", account, password),
            format!("GRANT {} ON {}.* TO {}", privileges, db, account),
            "FLUSH PRIVILEGES".to_string(),
        ])
    }

    fn validated_privileges(&self) -> Result<String> {
        let mut out = Vec::with_capacity(self.privileges.len());
        for p in &self.privileges {
            let p = p.trim().to_ascii_uppercase();
            if p.is_empty() || !p.chars().all(|c| c.is_ascii_uppercase() || c == ' ') {
                return Err(FleetError::InvalidIdentifier(p));
            }
            out.push(p);
        }
        if out.is_empty() {
            return Err(FleetError::InvalidIdentifier(String::new()));
        }
        Ok(out.join(", "))
    }
}

/// Runs every statement of `plan`, stopping at the first failure.
pub async fn provision(client: &dyn SqlClient, plan: &ProvisionPlan) -> Result<()> {
    let statements = plan.statements()?;
    info!(
        "🏗 Provisioning database {} with {} statements",
        plan.database,
        statements.len()
    );
    for statement in &statements {
        client.execute(statement).await?;
    }
    info!(
        "✅ Provisioned {} and user {}@{}",
        plan.database, plan.app_user, plan.app_host
    );
    Ok(())
}

/// INSERT registering one target in the inventory table.
pub fn insert_target_sql(
    table: &str,
    user_column: &str,
    host_column: &str,
    target: &Target,
    description: Option<&str>,
) -> Result<String> {
    let description = description
        .map(quote_literal)
        .unwrap_or_else(|| "NULL".to_string());
    Ok(format!(
        "INSERT INTO {} ({}, {}, `description`) VALUES ({}, {}, {})",
        quote_table(table)?,
        quote_identifier(user_column)?,
        quote_identifier(host_column)?,
        quote_literal(&target.user),
        quote_literal(&target.host),
        description
    ))
}
