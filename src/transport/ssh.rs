use crate::error::{FleetError, Result};
use crate::models::config::SshConfig;
use crate::models::remote_command::RemoteCommand;
use crate::models::target::Target;
use crate::transport::{RemoteOutput, Transport};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// ssh reserves this exit status for its own failures.
const SSH_ERROR_STATUS: i32 = 255;

/// Executes commands through the system `ssh` client.
pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Full argument list for `ssh`, ending with `user@host -- <command>`.
    pub fn build_args(&self, target: &Target, command: &RemoteCommand) -> Vec<String> {
        let cfg = &self.config;
        let mut args = Vec::new();

        if cfg.allocate_tty {
            args.push("-tt".to_string());
        } else {
            args.push("-T".to_string());
        }
        if let Some(port) = cfg.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(key) = &cfg.identity_file {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().to_string());
        }

        let mut options = vec![
            "BatchMode=yes".to_string(),
            format!("ConnectTimeout={}", cfg.connect_timeout.as_secs().max(1)),
            "LogLevel=ERROR".to_string(),
        ];
        if cfg.strict_host_key_checking {
            options.push("StrictHostKeyChecking=yes".to_string());
        } else {
            options.push("StrictHostKeyChecking=no".to_string());
            options.push("UserKnownHostsFile=/dev/null".to_string());
        }
        options.extend(cfg.extra_options.iter().cloned());
        for option in options {
            args.push("-o".to_string());
            args.push(option);
        }

        args.push(target.to_string());
        args.push("--".to_string());
        args.push(command.render(target));
        args
    }

    /// The equivalent shell command line, for logs and dry runs.
    pub fn command_line(&self, target: &Target, command: &RemoteCommand) -> String {
        shell_words::join(
            std::iter::once(self.config.binary.clone()).chain(self.build_args(target, command)),
        )
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn execute(&self, target: &Target, command: &RemoteCommand) -> Result<RemoteOutput> {
        debug!("🚀 Executing: {}", self.command_line(target, command));

        let output = Command::new(&self.config.binary)
            .args(self.build_args(target, command))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FleetError::Connection {
                target: target.to_string(),
                message: format!("failed to execute {}: {}", self.config.binary, e),
                output: String::new(),
            })?;

        interpret(target, output.status.code(), &output.stdout, &output.stderr)
    }
}

/// Maps a finished ssh process to the remote outcome. Status 255 and death by
/// signal are connection failures; the captured output is kept either way.
fn interpret(
    target: &Target,
    exit_status: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<RemoteOutput> {
    let stderr = String::from_utf8_lossy(stderr);
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }

    match exit_status {
        None => Err(FleetError::Connection {
            target: target.to_string(),
            message: "ssh terminated by signal".to_string(),
            output: combined,
        }),
        Some(SSH_ERROR_STATUS) => {
            warn!("⚠️  ssh to {} failed: {}", target, stderr.trim());
            Err(FleetError::Connection {
                target: target.to_string(),
                message: if stderr.trim().is_empty() {
                    "ssh exited with status 255".to_string()
                } else {
                    stderr.trim().to_string()
                },
                output: combined,
            })
        }
        Some(exit_status) => Ok(RemoteOutput {
            exit_status,
            output: combined,
        }),
    }
}
