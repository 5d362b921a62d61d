//! Turns a [`HostSource`] into the ordered list of targets for a run.
//!
//! Malformed entries are collected as [`RejectedEntry`] values instead of
//! failing the whole resolution; only source-level problems (missing file,
//! failed query, empty query result) are errors.

use crate::db::SqlClient;
use crate::error::{FleetError, Result};
use crate::models::execution::RejectedEntry;
use crate::models::host_source::{HostSource, InventoryQuery};
use crate::models::target::Target;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub targets: Vec<Target>,
    pub rejected: Vec<RejectedEntry>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.rejected.is_empty()
    }

    fn push(&mut self, location: String, raw: &str) {
        match Target::parse(raw) {
            Ok(target) => self.targets.push(target),
            Err(e) => {
                warn!("⚠️  Skipping {} '{}': {}", location, raw, e);
                self.rejected.push(RejectedEntry {
                    location,
                    raw: raw.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Resolves `source` to targets, in source order. Duplicates are kept.
///
/// `client` is only consulted for [`HostSource::Query`].
pub async fn resolve(source: &HostSource, client: Option<&dyn SqlClient>) -> Result<Resolution> {
    debug!("🔍 Resolving hosts from {}", source.describe());

    let resolution = match source {
        HostSource::Manual(raw) => resolve_manual(raw),
        HostSource::File(path) => resolve_file(path).await?,
        HostSource::Query(query) => {
            let client = client.ok_or_else(|| {
                FleetError::Config("database host source requires a SQL client".to_string())
            })?;
            resolve_query(query, client).await?
        }
    };

    info!(
        "📋 Resolved {} targets ({} rejected) from {}",
        resolution.targets.len(),
        resolution.rejected.len(),
        source.describe()
    );
    Ok(resolution)
}

pub fn resolve_manual(raw: &[String]) -> Resolution {
    let mut resolution = Resolution::default();
    for (idx, token) in raw.iter().flat_map(|s| s.split_whitespace()).enumerate() {
        resolution.push(format!("token {}", idx + 1), token);
    }
    resolution
}

pub async fn resolve_file(path: &Path) -> Result<Resolution> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => FleetError::SourceNotFound(path.to_path_buf()),
            _ => FleetError::SourceUnreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
    Ok(parse_inventory(&contents))
}

/// Parses inventory file contents: one `user@host` per line, blank lines and
/// `#` comments ignored.
pub fn parse_inventory(contents: &str) -> Resolution {
    let mut resolution = Resolution::default();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        resolution.push(format!("line {}", idx + 1), line);
    }
    resolution
}

/// Runs the inventory SELECT.
///
/// A failed query and an empty result are different outcomes: the first is
/// `QueryExecution` (from the client), the second is `NoTargets`.
pub async fn resolve_query(query: &InventoryQuery, client: &dyn SqlClient) -> Result<Resolution> {
    let sql = query.to_sql()?;
    debug!("🚀 Inventory query: {}", sql);

    let rows = client.query(&sql).await?;
    if rows.is_empty() {
        warn!("⚠️  No hosts found in {}", query.table);
        return Err(FleetError::NoTargets);
    }

    let mut resolution = Resolution::default();
    for (idx, row) in rows.iter().enumerate() {
        let raw = row.first().map(String::as_str).unwrap_or("NULL");
        resolution.push(format!("row {}", idx + 1), raw);
    }
    Ok(resolution)
}

/// Writes targets as an inventory file that [`resolve_file`] reads back
/// unchanged.
pub async fn write_inventory_file(path: &Path, targets: &[Target]) -> Result<()> {
    let mut contents = String::from("# fleet-runner host inventory: one user@host per line\n");
    for target in targets {
        contents.push_str(&target.to_string());
        contents.push('\n');
    }
    tokio::fs::write(path, contents).await?;
    info!("✅ Wrote {} targets to {}", targets.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticClient {
        rows: Result<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl SqlClient for StaticClient {
        async fn query(&self, _sql: &str) -> Result<Vec<Vec<String>>> {
            match &self.rows {
                Ok(rows) => Ok(rows.clone()),
                Err(FleetError::QueryExecution { status, stderr }) => {
                    Err(FleetError::QueryExecution {
                        status: *status,
                        stderr: stderr.clone(),
                    })
                }
                Err(e) => panic!("unsupported fixture error {e:?}"),
            }
        }

        async fn execute(&self, _sql: &str) -> Result<()> {
            Ok(())
        }
    }

    fn query() -> InventoryQuery {
        InventoryQuery {
            table: "hosts".to_string(),
            user_column: "ssh_user".to_string(),
            host_column: "hostname".to_string(),
            where_clause: None,
        }
    }

    fn hosts(resolution: &Resolution) -> Vec<String> {
        resolution.targets.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_manual_preserves_order_and_duplicates() {
        let r = resolve_manual(&[
            "a@10.0.0.1 b@10.0.0.2".to_string(),
            "  a@10.0.0.1\tc@10.0.0.3 ".to_string(),
        ]);
        assert_eq!(
            hosts(&r),
            vec!["a@10.0.0.1", "b@10.0.0.2", "a@10.0.0.1", "c@10.0.0.3"]
        );
        assert!(r.rejected.is_empty());
    }

    #[test]
    fn test_manual_rejects_token_without_at() {
        let r = resolve_manual(&["a@h1 oops b@h2".to_string()]);
        assert_eq!(hosts(&r), vec!["a@h1", "b@h2"]);
        assert_eq!(r.rejected.len(), 1);
        assert_eq!(r.rejected[0].location, "token 2");
        assert_eq!(r.rejected[0].raw, "oops");
    }

    #[test]
    fn test_inventory_skips_comments_and_blanks() {
        let r = parse_inventory("# comment\nops@web-1\n\n   \n  # indented comment\nops@web-2\n");
        assert_eq!(hosts(&r), vec!["ops@web-1", "ops@web-2"]);
        assert!(r.rejected.is_empty());
    }

    #[test]
    fn test_inventory_reports_line_numbers() {
        let r = parse_inventory("ops@a\nnot-a-target\nops@b\n");
        assert_eq!(hosts(&r), vec!["ops@a", "ops@b"]);
        assert_eq!(r.rejected.len(), 1);
        assert_eq!(r.rejected[0].location, "line 2");
        assert!(r.rejected[0].message.contains("not-a-target"));
    }

    #[tokio::test]
    async fn test_missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_file(&dir.path().join("absent.txt")).await.unwrap_err();
        assert!(matches!(err, FleetError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_write_then_resolve_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.txt");
        let targets = vec![
            Target::new("root", "10.1.0.5"),
            Target::new("deploy", "app-02.example.org"),
            Target::new("root", "10.1.0.5"),
        ];
        write_inventory_file(&path, &targets).await.unwrap();

        let r = resolve(&HostSource::File(path), None).await.unwrap();
        assert_eq!(r.targets, targets);
        assert!(r.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_query_rows_become_targets() {
        let client = StaticClient {
            rows: Ok(vec![
                vec!["ops@db-1".to_string()],
                vec!["NULL".to_string()],
                vec!["ops@db-2".to_string()],
            ]),
        };
        let r = resolve(&HostSource::Query(query()), Some(&client))
            .await
            .unwrap();
        assert_eq!(hosts(&r), vec!["ops@db-1", "ops@db-2"]);
        assert_eq!(r.rejected.len(), 1);
        assert_eq!(r.rejected[0].location, "row 2");
    }

    #[tokio::test]
    async fn test_query_with_zero_rows_is_no_targets() {
        let client = StaticClient { rows: Ok(vec![]) };
        let err = resolve_query(&query(), &client).await.unwrap_err();
        assert!(matches!(err, FleetError::NoTargets));
    }

    #[tokio::test]
    async fn test_query_failure_is_not_conflated_with_empty() {
        let client = StaticClient {
            rows: Err(FleetError::QueryExecution {
                status: Some(1),
                stderr: "ERROR 1045 (28000): Access denied".to_string(),
            }),
        };
        let err = resolve_query(&query(), &client).await.unwrap_err();
        match err {
            FleetError::QueryExecution { status, stderr } => {
                assert_eq!(status, Some(1));
                assert!(stderr.contains("Access denied"));
            }
            other => panic!("expected QueryExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_source_requires_client() {
        let err = resolve(&HostSource::Query(query()), None).await.unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }
}
