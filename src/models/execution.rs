use crate::models::target::Target;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How the runner dispatches work across the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExecutionMode {
    Sequential,
    Concurrent { max_concurrency: usize },
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Concurrent { max_concurrency } => {
                write!(f, "concurrent (max {})", max_concurrency)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// ssh could not connect or authenticate
    Connection,
    /// the command ran and exited non-zero
    RemoteExecution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionStatus {
    Succeeded,
    Failed { kind: FailureKind, message: String },
    TimedOut,
    Cancelled,
}

/// Outcome of running the command on one target.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub target: Target,
    pub status: ExecutionStatus,
    pub exit_status: Option<i32>,
    pub output: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }

    pub fn cancelled(target: Target) -> Self {
        Self {
            target,
            status: ExecutionStatus::Cancelled,
            exit_status: None,
            output: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Short human label for summaries.
    pub fn describe(&self) -> String {
        match &self.status {
            ExecutionStatus::Succeeded => "ok".to_string(),
            ExecutionStatus::Failed { message, .. } => message.clone(),
            ExecutionStatus::TimedOut => format!("timed out after {:.1}s", self.duration.as_secs_f64()),
            ExecutionStatus::Cancelled => "cancelled".to_string(),
        }
    }
}

/// An inventory entry that could not become a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    /// e.g. `line 3`, `token 2`, `row 7`
    pub location: String,
    pub raw: String,
    pub message: String,
}

impl fmt::Display for RejectedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.raw, self.location, self.message)
    }
}

/// Every result of one invocation.
///
/// In concurrent mode `results` is in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: ExecutionMode,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ExecutionResult>,
    pub rejected: Vec<RejectedEntry>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.rejected.is_empty() && self.results.iter().all(ExecutionResult::success)
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    pub fn with_rejected(mut self, rejected: Vec<RejectedEntry>) -> Self {
        self.rejected = rejected;
        self
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| r.success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.success())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.results.len(),
            rejected: self.rejected.len(),
            elapsed: (self.finished_at - self.started_at)
                .to_std()
                .unwrap_or_default(),
            ..Default::default()
        };
        for result in &self.results {
            match result.status {
                ExecutionStatus::Succeeded => summary.succeeded += 1,
                ExecutionStatus::Failed { .. } => summary.failed += 1,
                ExecutionStatus::TimedOut => summary.timed_out += 1,
                ExecutionStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub rejected: usize,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} targets: {} succeeded, {} failed, {} timed out, {} cancelled, {} rejected in {:.2}s",
            self.total,
            self.succeeded,
            self.failed,
            self.timed_out,
            self.cancelled,
            self.rejected,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(host: &str, status: ExecutionStatus) -> ExecutionResult {
        ExecutionResult {
            target: Target::new("ops", host),
            status,
            exit_status: None,
            output: String::new(),
            duration: Duration::from_millis(5),
        }
    }

    fn report(results: Vec<ExecutionResult>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            mode: ExecutionMode::Sequential,
            command: "true".to_string(),
            started_at: now,
            finished_at: now,
            results,
            rejected: vec![],
        }
    }

    #[test]
    fn test_summary_counts_each_status() {
        let r = report(vec![
            result("a", ExecutionStatus::Succeeded),
            result(
                "b",
                ExecutionStatus::Failed {
                    kind: FailureKind::Connection,
                    message: "refused".into(),
                },
            ),
            result("c", ExecutionStatus::TimedOut),
            result("d", ExecutionStatus::Cancelled),
            result("e", ExecutionStatus::Succeeded),
        ]);
        let s = r.summary();
        assert_eq!(s.total, 5);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.timed_out, 1);
        assert_eq!(s.cancelled, 1);
        assert!(!r.success());
        assert_eq!(r.exit_code(), 1);
        assert_eq!(r.failed().count(), 3);
    }

    #[test]
    fn test_rejected_entries_fail_the_report() {
        let r = report(vec![result("a", ExecutionStatus::Succeeded)]);
        assert!(r.success());

        let r = r.with_rejected(vec![RejectedEntry {
            location: "line 2".into(),
            raw: "not-a-target".into(),
            message: "expected user@host".into(),
        }]);
        assert!(!r.success());
        assert_eq!(r.summary().rejected, 1);
    }

    #[test]
    fn test_report_serializes_status_tags() {
        let r = report(vec![result("a", ExecutionStatus::Succeeded)]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["results"][0]["status"]["status"], "succeeded");
        assert_eq!(json["mode"]["mode"], "sequential");
        assert_eq!(json["results"][0]["target"]["host"], "a");
    }
}
