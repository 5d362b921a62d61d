use crate::inventory::Resolution;
use crate::models::execution::{ExecutionStatus, RunReport};
use std::fmt::Write as _;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn log_resolution(resolution: &Resolution) {
    for entry in &resolution.rejected {
        warn!("⚠️  Rejected {}", entry);
    }
}

pub fn log_run_summary(report: &RunReport) {
    let summary = report.summary();
    info!("=== Run {} ===", report.run_id);
    info!("Command: {}", report.command);
    info!("Mode: {}", report.mode);

    for result in &report.results {
        match result.status {
            ExecutionStatus::Succeeded => info!("  ✅ {}", result.target),
            _ => error!("  ❌ {} - {}", result.target, result.describe()),
        }
    }
    for entry in &report.rejected {
        error!("  ❌ {}", entry);
    }

    if report.success() {
        info!("✅ {}", summary);
    } else {
        error!("❌ {}", summary);
    }
}

/// Plain-text end-of-run report: one line per target, then the totals.
pub fn render_report(report: &RunReport, show_output: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Succeeded:");
    for result in report.succeeded() {
        let _ = writeln!(out, "  {}", result.target);
        if show_output {
            push_output(&mut out, &result.output);
        }
    }

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() || !report.rejected.is_empty() {
        let _ = writeln!(out, "Failed:");
        for result in failed {
            let _ = writeln!(out, "  {} ({})", result.target, result.describe());
            if show_output {
                push_output(&mut out, &result.output);
            }
        }
        for entry in &report.rejected {
            let _ = writeln!(out, "  {}", entry);
        }
    }

    let _ = writeln!(out, "{}", report.summary());
    out
}

fn push_output(out: &mut String, output: &str) {
    for line in output.lines() {
        let _ = writeln!(out, "    | {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::execution::{
        ExecutionMode, ExecutionResult, FailureKind, RejectedEntry,
    };
    use crate::models::target::Target;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_render_report_lists_both_sides() {
        let now = Utc::now();
        let report = RunReport {
            run_id: Uuid::new_v4(),
            mode: ExecutionMode::Sequential,
            command: "uptime".to_string(),
            started_at: now,
            finished_at: now,
            results: vec![
                ExecutionResult {
                    target: Target::new("ops", "a"),
                    status: ExecutionStatus::Succeeded,
                    exit_status: Some(0),
                    output: "up 3 days".to_string(),
                    duration: Duration::from_millis(10),
                },
                ExecutionResult {
                    target: Target::new("ops", "b"),
                    status: ExecutionStatus::Failed {
                        kind: FailureKind::Connection,
                        message: "connection to ops@b failed: refused".to_string(),
                    },
                    exit_status: None,
                    output: String::new(),
                    duration: Duration::from_millis(10),
                },
            ],
            rejected: vec![RejectedEntry {
                location: "line 4".to_string(),
                raw: "bogus".to_string(),
                message: "malformed".to_string(),
            }],
        };

        let text = render_report(&report, true);
        assert!(text.contains("Succeeded:\n  ops@a\n    | up 3 days\n"));
        assert!(text.contains("Failed:\n  ops@b (connection to ops@b failed: refused)\n"));
        assert!(text.contains("  bogus (line 4): malformed\n"));
        assert!(text.contains("2 targets: 1 succeeded, 1 failed"));
    }
}
