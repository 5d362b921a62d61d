//! Fans one command out over the fleet.
//!
//! Each target is attempted exactly once. Failures are recorded in that
//! target's [`ExecutionResult`] and never stop the others.

use crate::error::FleetError;
use crate::models::execution::{
    ExecutionMode, ExecutionResult, ExecutionStatus, FailureKind, RunReport,
};
use crate::models::remote_command::RemoteCommand;
use crate::models::target::Target;
use crate::transport::{RemoteOutput, Transport};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: ExecutionMode,
    /// Per-target limit on a single remote execution
    pub command_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            command_timeout: None,
        }
    }
}

pub struct FleetRunner {
    transport: Arc<dyn Transport>,
    options: RunOptions,
}

impl FleetRunner {
    pub fn new(transport: Arc<dyn Transport>, options: RunOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs `command` on every target and returns once all are finished.
    ///
    /// When `cancel` fires, in-flight executions are aborted and every target
    /// not yet finished is recorded as cancelled.
    pub async fn run(
        &self,
        targets: &[Target],
        command: &RemoteCommand,
        cancel: &CancellationToken,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let command_text = shell_words::join(
            std::iter::once(&command.program).chain(command.args.iter()),
        );

        info!(
            "🚀 Run {}: `{}` on {} targets ({})",
            run_id,
            command_text,
            targets.len(),
            self.options.mode
        );

        let results = match self.options.mode {
            ExecutionMode::Sequential => self.run_sequential(targets, command, cancel).await,
            ExecutionMode::Concurrent { max_concurrency } => {
                self.run_concurrent(targets, command, cancel, max_concurrency.max(1))
                    .await
            }
        };

        RunReport {
            run_id,
            mode: self.options.mode,
            command: command_text,
            started_at,
            finished_at: Utc::now(),
            results,
            rejected: Vec::new(),
        }
    }

    async fn run_sequential(
        &self,
        targets: &[Target],
        command: &RemoteCommand,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(
                execute_one(
                    self.transport.as_ref(),
                    target,
                    command,
                    self.options.command_timeout,
                    cancel,
                )
                .await,
            );
        }
        results
    }

    async fn run_concurrent(
        &self,
        targets: &[Target],
        command: &RemoteCommand,
        cancel: &CancellationToken,
        max_concurrency: usize,
    ) -> Vec<ExecutionResult> {
        debug!("Dispatching {} targets, at most {} at once", targets.len(), max_concurrency);
        let timeout = self.options.command_timeout;
        let transport = self.transport.as_ref();

        stream::iter(targets.iter())
            .map(|target| execute_one(transport, target, command, timeout, cancel))
            .buffer_unordered(max_concurrency)
            .collect()
            .await
    }
}

enum Attempt {
    Finished(crate::error::Result<RemoteOutput>),
    TimedOut,
    Cancelled,
}

async fn execute_one(
    transport: &dyn Transport,
    target: &Target,
    command: &RemoteCommand,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> ExecutionResult {
    if cancel.is_cancelled() {
        debug!("Skipping {}: run cancelled", target);
        return ExecutionResult::cancelled(target.clone());
    }

    let start = Instant::now();
    let execution = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, transport.execute(target, command)).await {
                Ok(result) => Attempt::Finished(result),
                Err(_) => Attempt::TimedOut,
            },
            None => Attempt::Finished(transport.execute(target, command).await),
        }
    };

    let attempt = tokio::select! {
        biased;
        _ = cancel.cancelled() => Attempt::Cancelled,
        attempt = execution => attempt,
    };
    let duration = start.elapsed();

    let result = match attempt {
        Attempt::Finished(Ok(out)) if out.success() => ExecutionResult {
            target: target.clone(),
            status: ExecutionStatus::Succeeded,
            exit_status: Some(out.exit_status),
            output: out.output,
            duration,
        },
        Attempt::Finished(Ok(out)) => {
            let err = FleetError::RemoteExecution {
                target: target.to_string(),
                exit_status: out.exit_status,
            };
            ExecutionResult {
                target: target.clone(),
                status: ExecutionStatus::Failed {
                    kind: FailureKind::RemoteExecution,
                    message: err.to_string(),
                },
                exit_status: Some(out.exit_status),
                output: out.output,
                duration,
            }
        }
        Attempt::Finished(Err(err)) => {
            let output = match &err {
                FleetError::Connection { output, .. } => output.clone(),
                _ => String::new(),
            };
            ExecutionResult {
                target: target.clone(),
                status: ExecutionStatus::Failed {
                    kind: FailureKind::Connection,
                    message: err.to_string(),
                },
                exit_status: None,
                output,
                duration,
            }
        }
        Attempt::TimedOut => ExecutionResult {
            target: target.clone(),
            status: ExecutionStatus::TimedOut,
            exit_status: None,
            output: String::new(),
            duration,
        },
        Attempt::Cancelled => ExecutionResult {
            duration,
            ..ExecutionResult::cancelled(target.clone())
        },
    };

    match &result.status {
        ExecutionStatus::Succeeded => {
            info!("✅ {} finished in {:.2}s", target, duration.as_secs_f64())
        }
        ExecutionStatus::Failed { message, .. } => error!("❌ {}: {}", target, message),
        ExecutionStatus::TimedOut => warn!(
            "⚠️  {} timed out after {:.1}s",
            target,
            duration.as_secs_f64()
        ),
        ExecutionStatus::Cancelled => warn!("⚠️  {} cancelled", target),
    }

    result
}
