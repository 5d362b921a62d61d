use crate::db::SqlClient;
use crate::error::{FleetError, Result};
use crate::models::config::DatabaseConfig;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tracing::debug;

/// Talks to MariaDB over the MySQL wire protocol through sqlx.
///
/// Credentials stay in process memory for the life of the pool.
pub struct NativeClient {
    pool: MySqlPool,
}

impl NativeClient {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password);
        if let Some(db) = &cfg.name {
            options = options.database(db);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(cfg.timeout)
            .connect_with(options)
            .await
            .map_err(|e| FleetError::Credential(e.to_string()))?;

        debug!("🔌 Connected to {}", cfg.display_target());
        Ok(Self { pool })
    }
}

#[async_trait]
impl SqlClient for NativeClient {
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FleetError::QueryExecution {
                status: None,
                stderr: e.to_string(),
            })?;
        Ok(rows.iter().map(row_to_strings).collect())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| FleetError::Execution {
                status: None,
                stderr: e.to_string(),
            })?;
        Ok(())
    }
}

/// Text rendering of each column, `NULL` as the CLI prints it.
fn row_to_strings(row: &MySqlRow) -> Vec<String> {
    (0..row.columns().len())
        .map(|idx| {
            if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
                return v.unwrap_or_else(|| "NULL".to_string());
            }
            if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                return v.map(|n| n.to_string()).unwrap_or_else(|| "NULL".to_string());
            }
            row.try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_else(|| "NULL".to_string())
        })
        .collect()
}
