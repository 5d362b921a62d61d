use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Shell out to the `mariadb` command-line client.
    #[default]
    Cli,
    /// Talk the MySQL protocol directly through sqlx.
    Native,
}

/// MariaDB connection configuration.
///
/// This section is loaded from `[database]` in `config.toml`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Default schema; left unset when provisioning a fresh server.
    pub name: Option<String>,
    pub client: ClientKind,
    pub client_binary: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            name: None,
            client: ClientKind::Cli,
            client_binary: "mariadb".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `user@host:port/name`, safe to log.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user,
            self.host,
            self.port,
            self.name.as_deref().unwrap_or("")
        )
    }
}
