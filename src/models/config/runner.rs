use crate::models::execution::ExecutionMode;
use serde::Deserialize;
use std::time::Duration;

/// Fan-out behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Run targets concurrently instead of one after another
    pub parallel: bool,
    /// Upper bound on simultaneous ssh sessions in parallel mode
    pub max_concurrency: usize,
    /// Per-target limit; unset means wait for the remote command indefinitely
    #[serde(with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_concurrency: num_cpus::get() * 4,
            command_timeout: None,
        }
    }
}

impl RunnerConfig {
    pub fn execution_mode(&self) -> ExecutionMode {
        if self.parallel {
            ExecutionMode::Concurrent {
                max_concurrency: self.max_concurrency.max(1),
            }
        } else {
            ExecutionMode::Sequential
        }
    }
}
