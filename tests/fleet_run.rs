use async_trait::async_trait;
use fleet_runner::error::{FleetError, Result};
use fleet_runner::inventory;
use fleet_runner::models::execution::ExecutionStatus;
use fleet_runner::models::{ExecutionMode, HostSource, RemoteCommand, Target};
use fleet_runner::runner::{FleetRunner, RunOptions};
use fleet_runner::transport::{RemoteOutput, Transport};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Answers every host with exit 0 except those listed in `unreachable`.
#[derive(Default)]
struct FakeTransport {
    unreachable: Vec<String>,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, target: &Target, command: &RemoteCommand) -> Result<RemoteOutput> {
        self.seen.lock().unwrap().push(target.to_string());
        if self.unreachable.contains(&target.host) {
            return Err(FleetError::Connection {
                target: target.to_string(),
                message: "No route to host".to_string(),
                output: String::new(),
            });
        }
        Ok(RemoteOutput {
            exit_status: 0,
            output: command.words_for(target).join(" "),
        })
    }
}

fn inventory_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_manual_hosts_run_sequentially_in_order() {
    let source = HostSource::Manual(vec!["a@10.0.0.1 b@10.0.0.2".to_string()]);
    let resolution = inventory::resolve(&source, None).await.unwrap();

    let transport = Arc::new(FakeTransport::default());
    let runner = FleetRunner::new(transport.clone(), RunOptions::default());
    let report = runner
        .run(
            &resolution.targets,
            &RemoteCommand::new("true"),
            &CancellationToken::new(),
        )
        .await
        .with_rejected(resolution.rejected);

    assert!(report.success());
    assert_eq!(report.exit_code(), 0);
    let hosts: Vec<_> = report.results.iter().map(|r| r.target.to_string()).collect();
    assert_eq!(hosts, vec!["a@10.0.0.1", "b@10.0.0.2"]);
    assert_eq!(
        *transport.seen.lock().unwrap(),
        vec!["a@10.0.0.1".to_string(), "b@10.0.0.2".to_string()]
    );
}

#[tokio::test]
async fn test_inventory_file_skips_comments_and_blanks() {
    let file = inventory_file("# web tier\n\nops@web-1\n   \nops@web-2\n");
    let resolution = inventory::resolve(&HostSource::File(file.path().to_path_buf()), None)
        .await
        .unwrap();

    assert_eq!(
        resolution.targets,
        vec![Target::new("ops", "web-1"), Target::new("ops", "web-2")]
    );
    assert!(resolution.rejected.is_empty());
}

#[tokio::test]
async fn test_malformed_line_is_reported_and_run_continues() {
    let file = inventory_file("ops@web-1\nnot-a-target\nops@web-2\n");
    let resolution = inventory::resolve(&HostSource::File(file.path().to_path_buf()), None)
        .await
        .unwrap();
    assert_eq!(resolution.targets.len(), 2);
    assert_eq!(resolution.rejected.len(), 1);
    assert_eq!(resolution.rejected[0].raw, "not-a-target");

    let runner = FleetRunner::new(Arc::new(FakeTransport::default()), RunOptions::default());
    let report = runner
        .run(
            &resolution.targets,
            &RemoteCommand::new("uptime"),
            &CancellationToken::new(),
        )
        .await
        .with_rejected(resolution.rejected);

    assert_eq!(report.succeeded().count(), 2);
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.summary().rejected, 1);
}

#[tokio::test]
async fn test_unreachable_host_does_not_stop_concurrent_run() {
    let source = HostSource::Manual(vec![
        "ops@web-1".to_string(),
        "ops@web-2 ops@web-3".to_string(),
    ]);
    let resolution = inventory::resolve(&source, None).await.unwrap();

    let transport = Arc::new(FakeTransport {
        unreachable: vec!["web-2".to_string()],
        ..Default::default()
    });
    let runner = FleetRunner::new(
        transport,
        RunOptions {
            mode: ExecutionMode::Concurrent { max_concurrency: 2 },
            command_timeout: None,
        },
    );
    let report = runner
        .run(
            &resolution.targets,
            &RemoteCommand::new("echo").arg("{user}@{host}"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded().count(), 2);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target, Target::new("ops", "web-2"));
    assert!(matches!(failed[0].status, ExecutionStatus::Failed { .. }));

    let web1 = report
        .results
        .iter()
        .find(|r| r.target.host == "web-1")
        .unwrap();
    assert_eq!(web1.output, "echo ops@web-1");
}

#[tokio::test]
async fn test_missing_inventory_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = inventory::resolve(&HostSource::File(dir.path().join("absent.txt")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::SourceNotFound(_)));
    assert!(err.is_resolution_error());
}
