use crate::db::SqlClient;
use crate::db::credentials::CredentialFile;
use crate::error::{FleetError, Result};
use crate::models::config::DatabaseConfig;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Runs SQL through the `mariadb` command-line client.
///
/// Credentials reach the client through a [`CredentialFile`], never through
/// argv or the environment.
pub struct MariaDbCli {
    binary: String,
    database: Option<String>,
    timeout: Duration,
    credentials: CredentialFile,
}

impl MariaDbCli {
    pub fn new(cfg: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            binary: cfg.client_binary.clone(),
            database: cfg.name.clone(),
            timeout: cfg.timeout,
            credentials: CredentialFile::create(cfg)?,
        })
    }

    pub fn credentials_path(&self) -> &std::path::Path {
        self.credentials.path()
    }

    /// Client arguments for one statement. `--defaults-extra-file` must come first.
    pub fn build_args(&self, sql: &str) -> Vec<String> {
        let mut args = vec![
            format!("--defaults-extra-file={}", self.credentials.path().display()),
            "--batch".to_string(),
            "--skip-column-names".to_string(),
            "--raw".to_string(),
        ];
        if let Some(db) = &self.database {
            args.push(format!("--database={}", db));
        }
        args.push("--execute".to_string());
        args.push(sql.to_string());
        args
    }

    /// Runs the client; `Err` only when it could not be run to completion.
    async fn run(&self, sql: &str) -> std::result::Result<Output, String> {
        debug!("🚀 Executing: {} --execute <{} bytes>", self.binary, sql.len());

        let child = Command::new(&self.binary)
            .args(self.build_args(sql))
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(format!("failed to execute {}: {}", self.binary, e)),
            Err(_) => Err(format!(
                "{} timed out after {:.1}s",
                self.binary,
                self.timeout.as_secs_f64()
            )),
        }
    }
}

#[async_trait]
impl SqlClient for MariaDbCli {
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let output = self
            .run(sql)
            .await
            .map_err(|stderr| FleetError::QueryExecution { status: None, stderr })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "❌ {} failed with exit code {}: {}",
                self.binary,
                output.status.code().unwrap_or(-1),
                stderr
            );
            return Err(FleetError::QueryExecution {
                status: output.status.code(),
                stderr,
            });
        }

        Ok(parse_batch_output(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let output = self
            .run(sql)
            .await
            .map_err(|stderr| FleetError::Execution { status: None, stderr })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "❌ {} failed with exit code {}: {}",
                self.binary,
                output.status.code().unwrap_or(-1),
                stderr
            );
            return Err(FleetError::Execution {
                status: output.status.code(),
                stderr,
            });
        }
        Ok(())
    }
}

/// Splits `--batch --skip-column-names` output into rows of tab-separated
/// columns.
pub fn parse_batch_output(stdout: &str) -> Vec<Vec<String>> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}
