//! Remote execution boundary: run one command on one target.

pub mod dry_run;
pub mod ssh;

use crate::error::Result;
use crate::models::remote_command::RemoteCommand;
use crate::models::target::Target;
use async_trait::async_trait;

pub use dry_run::DryRunTransport;
pub use ssh::SshTransport;

/// What came back from a finished remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOutput {
    pub exit_status: i32,
    /// stdout followed by stderr
    pub output: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Runs `command` on `target`.
    ///
    /// `Err` means the command never ran to completion (no connection,
    /// authentication refused, client missing). A command that ran and
    /// exited non-zero is `Ok` with that status.
    ///
    /// Dropping the returned future must abort the remote execution.
    async fn execute(&self, target: &Target, command: &RemoteCommand) -> Result<RemoteOutput>;
}
