use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use fleet_runner::config::load_config;
use fleet_runner::db::provision::{ProvisionPlan, insert_target_sql, provision};
use fleet_runner::db::{self, SqlClient, cancellable};
use fleet_runner::error::FleetError;
use fleet_runner::inventory::{self, Resolution};
use fleet_runner::log::{init_tracing, log_resolution, log_run_summary, render_report};
use fleet_runner::models::config::FleetConfig;
use fleet_runner::models::{ExecutionMode, HostSource, InventoryQuery, RemoteCommand, Target};
use fleet_runner::runner::{FleetRunner, RunOptions};
use fleet_runner::transport::{DryRunTransport, SshTransport, Transport};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one command across a fleet of hosts over ssh", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: $FLEET_RUNNER_CONFIG or /etc/fleet-runner/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a command on every resolved host
    Run(RunArgs),
    /// Resolve and print the host list without running anything
    Hosts(HostsArgs),
    /// Register a host in the database inventory
    HostsAdd(HostsAddArgs),
    /// Create the inventory database, table, application user and grants
    Provision(ProvisionArgs),
    /// Check that the configured database login works
    CheckDb,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Whitespace-separated user@host list (repeatable)
    #[arg(long = "hosts-manual", value_name = "TARGETS")]
    hosts_manual: Vec<String>,

    /// Inventory file with one user@host per line
    #[arg(long, value_name = "PATH")]
    hosts_file: Option<PathBuf>,

    /// Read hosts from the [inventory] table of the configured database
    #[arg(long = "from-db", visible_alias = "db-query-config")]
    from_db: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Override the inventory WHERE condition (with --from-db)
    #[arg(long = "where", value_name = "SQL", requires = "from_db")]
    where_clause: Option<String>,

    /// Run hosts concurrently
    #[arg(long)]
    parallel: bool,

    /// Upper bound on concurrent ssh sessions
    #[arg(long, value_name = "N", requires = "parallel")]
    max_concurrency: Option<usize>,

    /// ssh identity file
    #[arg(short = 'i', long, value_name = "PATH")]
    identity_file: Option<PathBuf>,

    /// Per-host timeout, e.g. 30s or 10m
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Print the ssh invocations instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Emit the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Include each host's output in the text report
    #[arg(long)]
    show_output: bool,

    /// Run a shell script remotely via `sh -c`
    #[arg(long, value_name = "SCRIPT", conflicts_with = "command")]
    shell: Option<String>,

    /// Program and arguments to run remotely (after `--`)
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[derive(Args, Debug)]
struct HostsArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long = "where", value_name = "SQL", requires = "from_db")]
    where_clause: Option<String>,

    /// Also write the resolved hosts to an inventory file
    #[arg(long, value_name = "PATH")]
    write: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HostsAddArgs {
    /// user@host to register
    target: String,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct ProvisionArgs {
    /// Database to create (default: [database].name or "fleet")
    #[arg(long)]
    database: Option<String>,

    #[arg(long)]
    app_user: String,

    #[arg(long)]
    app_password: String,

    /// Account host part for the application user
    #[arg(long, default_value = "%")]
    app_host: String,

    /// Privileges to grant on the database (repeatable)
    #[arg(long = "privilege", value_name = "PRIV")]
    privileges: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    match dispatch(cli, cancel).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<ExitCode> {
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run(&cfg, args, &cancel).await,
        Commands::Hosts(args) => hosts(&cfg, args, &cancel).await,
        Commands::HostsAdd(args) => cancellable(&cancel, hosts_add(&cfg, args)).await,
        Commands::Provision(args) => cancellable(&cancel, provision_db(&cfg, args)).await,
        Commands::CheckDb => {
            cancellable(&cancel, db::connect(&cfg.database)).await?;
            println!("Database connection OK: {}", cfg.database.display_target());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(cfg: &FleetConfig, args: RunArgs, cancel: &CancellationToken) -> Result<ExitCode> {
    let command = match (&args.shell, RemoteCommand::from_argv(&args.command)) {
        (Some(script), _) => RemoteCommand::shell(script.clone()),
        (None, Some(command)) => command,
        (None, None) => bail!("nothing to run: pass --shell <SCRIPT> or -- <COMMAND> [ARGS]..."),
    };

    let resolution =
        resolve_hosts(cfg, &args.source, args.where_clause.clone(), cancel).await?;

    let mut ssh = cfg.ssh.clone();
    if let Some(key) = args.identity_file {
        ssh.identity_file = Some(key);
    }
    let transport: Arc<dyn Transport> = if args.dry_run {
        Arc::new(DryRunTransport::new(SshTransport::new(ssh)))
    } else {
        Arc::new(SshTransport::new(ssh))
    };

    let mode = if args.parallel || cfg.runner.parallel {
        ExecutionMode::Concurrent {
            max_concurrency: args
                .max_concurrency
                .unwrap_or(cfg.runner.max_concurrency)
                .max(1),
        }
    } else {
        ExecutionMode::Sequential
    };
    let options = RunOptions {
        mode,
        command_timeout: args.timeout.or(cfg.runner.command_timeout),
    };

    let runner = FleetRunner::new(transport, options);
    let report = runner
        .run(&resolution.targets, &command, cancel)
        .await
        .with_rejected(resolution.rejected);

    log_run_summary(&report);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing run report")?
        );
    } else {
        print!("{}", render_report(&report, args.show_output));
    }

    Ok(exit_code(report.exit_code()))
}

async fn hosts(cfg: &FleetConfig, args: HostsArgs, cancel: &CancellationToken) -> Result<ExitCode> {
    let resolution = resolve_hosts(cfg, &args.source, args.where_clause, cancel).await?;

    for target in &resolution.targets {
        println!("{}", target);
    }
    if let Some(path) = &args.write {
        inventory::write_inventory_file(path, &resolution.targets).await?;
    }

    Ok(if resolution.rejected.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn hosts_add(cfg: &FleetConfig, args: HostsAddArgs) -> Result<ExitCode> {
    let target = Target::parse(&args.target)?;
    let inv = &cfg.inventory;
    let sql = insert_target_sql(
        &inv.table,
        &inv.user_column,
        &inv.host_column,
        &target,
        args.description.as_deref(),
    )?;

    let client = db::connect(&cfg.database).await?;
    client.execute(&sql).await?;
    info!("✅ Registered {} in {}", target, inv.table);
    Ok(ExitCode::SUCCESS)
}

async fn provision_db(cfg: &FleetConfig, args: ProvisionArgs) -> Result<ExitCode> {
    let database = args
        .database
        .or_else(|| cfg.database.name.clone())
        .unwrap_or_else(|| "fleet".to_string());

    // The target schema may not exist yet.
    let mut admin = cfg.database.clone();
    admin.name = None;

    let table = match cfg.inventory.table.split_once('.') {
        Some((_, table)) => table.to_string(),
        None => cfg.inventory.table.clone(),
    };
    let plan = ProvisionPlan {
        database,
        table,
        user_column: cfg.inventory.user_column.clone(),
        host_column: cfg.inventory.host_column.clone(),
        app_user: args.app_user,
        app_password: args.app_password,
        app_host: args.app_host,
        privileges: if args.privileges.is_empty() {
            ProvisionPlan::default_privileges()
        } else {
            args.privileges
        },
    };

    let client = db::connect(&admin).await?;
    provision(client.as_ref(), &plan).await?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves the host list. Any database handle opened here is dropped (and
/// its credential file removed) before this returns, including on interrupt.
async fn resolve_hosts(
    cfg: &FleetConfig,
    source: &SourceArgs,
    where_clause: Option<String>,
    cancel: &CancellationToken,
) -> Result<Resolution> {
    let host_source = if let Some(path) = &source.hosts_file {
        HostSource::File(path.clone())
    } else if source.from_db {
        HostSource::Query(InventoryQuery::from_config(&cfg.inventory).with_where(where_clause))
    } else {
        HostSource::Manual(source.hosts_manual.clone())
    };

    let resolving = async {
        let client: Option<Box<dyn SqlClient>> = match &host_source {
            HostSource::Query(_) => Some(db::connect(&cfg.database).await?),
            _ => None,
        };
        inventory::resolve(&host_source, client.as_deref()).await
    };

    let resolution = cancellable(cancel, resolving)
        .await
        .context("resolving hosts")?;

    log_resolution(&resolution);
    if resolution.is_empty() {
        return Err(FleetError::NoTargets.into());
    }
    Ok(resolution)
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, cancelling unfinished hosts");
        cancel.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
