use crate::error::Result;
use crate::models::remote_command::RemoteCommand;
use crate::models::target::Target;
use crate::transport::{RemoteOutput, SshTransport, Transport};
use async_trait::async_trait;
use tracing::info;

/// Prints what would run instead of running it.
pub struct DryRunTransport {
    ssh: SshTransport,
}

impl DryRunTransport {
    pub fn new(ssh: SshTransport) -> Self {
        Self { ssh }
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn execute(&self, target: &Target, command: &RemoteCommand) -> Result<RemoteOutput> {
        let line = self.ssh.command_line(target, command);
        info!("📝 [dry-run] {}", line);
        Ok(RemoteOutput {
            exit_status: 0,
            output: line,
        })
    }
}
