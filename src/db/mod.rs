pub mod credentials;
pub mod mariadb_cli;
pub mod native;
pub mod provision;

use crate::error::{FleetError, Result};
use crate::models::config::{ClientKind, DatabaseConfig};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use mariadb_cli::MariaDbCli;
pub use native::NativeClient;

/// Minimal SQL capability: rows back from a query, success or failure for
/// everything else.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Runs `sql` and returns every row as text columns.
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>>;

    async fn execute(&self, sql: &str) -> Result<()>;
}

/// Opens a client for `cfg` and checks it with `SELECT 1`.
///
/// Any failure here is reported as [`FleetError::Credential`]: nothing can be
/// resolved from the database without a working login.
pub async fn connect(cfg: &DatabaseConfig) -> Result<Box<dyn SqlClient>> {
    debug!("🔌 Connecting to {} via {:?} client", cfg.display_target(), cfg.client);

    let client: Box<dyn SqlClient> = match cfg.client {
        ClientKind::Cli => Box::new(MariaDbCli::new(cfg)?),
        ClientKind::Native => Box::new(NativeClient::connect(cfg).await?),
    };

    validate(client.as_ref()).await?;
    info!("✅ Database connection to {} validated", cfg.display_target());
    Ok(client)
}

/// Runs the no-op query used to prove a login works.
pub async fn validate(client: &dyn SqlClient) -> Result<()> {
    client.query("SELECT 1").await.map_err(|e| match e {
        FleetError::QueryExecution { stderr, .. } => FleetError::Credential(stderr),
        other => other,
    })?;
    Ok(())
}

/// Runs `work` until it finishes or `cancel` fires.
///
/// On cancellation `work` is dropped along with any client it owns, which
/// removes that client's credential file before this returns
/// [`FleetError::Interrupted`].
pub async fn cancellable<T, E, F>(cancel: &CancellationToken, work: F) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: From<FleetError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("⚠️  Database work interrupted");
            Err(FleetError::Interrupted.into())
        }
        result = work => result,
    }
}
