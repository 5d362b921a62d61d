use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Options for the ssh client used to reach targets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub binary: String,
    pub identity_file: Option<PathBuf>,
    pub port: Option<u16>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub strict_host_key_checking: bool,
    /// Force a pseudo-terminal (`-tt`) for interactive remote commands
    pub allocate_tty: bool,
    /// Extra `-o` options, e.g. `ServerAliveInterval=15`
    pub extra_options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            identity_file: None,
            port: None,
            connect_timeout: Duration::from_secs(10),
            strict_host_key_checking: false,
            allocate_tty: false,
            extra_options: vec![],
        }
    }
}
