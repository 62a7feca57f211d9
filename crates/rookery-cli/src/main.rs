//! Rookery CLI
//!
//! Usage:
//!   rookery health                    Probe every backend
//!   rookery bench run <backend>       Benchmark one backend (mongodb, cassandra, redis)
//!   rookery bench all                 Benchmark all three backends in turn
//!   rookery bench info                Show the configured workload
//!   rookery shard before              Benchmark MongoDB before sharding
//!   rookery shard enable              Shard the collection on the configured key
//!   rookery shard after               Benchmark MongoDB after sharding
//!   rookery shard status              Show the observed sharding metadata
//!   rookery shard compare             before -> enable -> after, with improvement
//!
//! Global options:
//!   --config rookery.toml --format table --log-level debug
//!   --fetch-all 2 --per-key 1         Override the workload size

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rookery_bench::report::HealthStatus;
use rookery_bench::{BenchService, BenchmarkInfo, ConnectionRegistry, Settings, StatusView};
use rookery_common::{Backend, RookeryError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rookery")]
#[command(about = "Cross-engine query benchmark and MongoDB sharding comparison", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML); environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of fetch-all queries per run
    #[arg(long, global = true, value_name = "N")]
    fetch_all: Option<usize>,

    /// Number of queries per partition value
    #[arg(long, global = true, value_name = "M")]
    per_key: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Check which backends answer a liveness probe
    Health,
    /// Query benchmarks
    Bench {
        #[command(subcommand)]
        action: BenchAction,
    },
    /// MongoDB sharding lifecycle
    Shard {
        #[command(subcommand)]
        action: ShardAction,
    },
}

#[derive(Subcommand)]
enum BenchAction {
    /// Benchmark a single backend
    Run {
        /// mongodb, cassandra or redis
        #[arg(value_parser = parse_backend)]
        backend: Backend,
    },
    /// Benchmark every backend, one after another
    All,
    /// Show the workload configuration
    Info,
}

#[derive(Subcommand)]
enum ShardAction {
    /// Benchmark before sharding (also ensures the query indexes)
    Before,
    /// Enable sharding on the configured key
    Enable,
    /// Benchmark after sharding
    After,
    /// Show current sharding metadata
    Status,
    /// Run before, enable and after, then compare
    #[command(alias = "comparison")]
    Compare,
}

fn parse_backend(s: &str) -> std::result::Result<Backend, String> {
    s.parse().map_err(|e: RookeryError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let rt = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let healthy = rt.block_on(run(cli))?;
    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns false when the command completed but reported a degraded outcome
async fn run(cli: Cli) -> Result<bool> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(n) = cli.fetch_all {
        settings.benchmark.fetch_all_queries = n;
    }
    if let Some(m) = cli.per_key {
        settings.benchmark.queries_per_partition = m;
    }

    let registry = Arc::new(ConnectionRegistry::new(&settings));
    let service = BenchService::new(registry.clone(), &settings.benchmark);
    let format = cli.format;

    let needs_connections = !matches!(cli.command, Commands::Bench { action: BenchAction::Info });

    if needs_connections {
        registry.initialize().await;
    }
    let outcome = dispatch(&service, cli.command, format).await;
    if needs_connections {
        registry.shutdown().await;
    }
    outcome
}

async fn dispatch(service: &BenchService, command: Commands, format: OutputFormat) -> Result<bool> {
    match command {
        Commands::Health => {
            let report = service.health().await;
            emit(format, &report, |r| r.render_table())?;
            Ok(report.status == HealthStatus::Healthy)
        }
        Commands::Bench { action } => match action {
            BenchAction::Run { backend } => {
                let report = service
                    .run_single(backend)
                    .await
                    .with_context(|| format!("{} benchmark failed", backend.display_name()))?;
                emit(format, &report, |r| format!("{}\n{}", r.database, r.metrics.format()))?;
                Ok(true)
            }
            BenchAction::All => {
                let report = service.run_all().await.context("Benchmark failed")?;
                emit(format, &report, |r| r.render_table())?;
                Ok(true)
            }
            BenchAction::Info => {
                let info = service.info();
                emit(format, &info, render_info)?;
                Ok(true)
            }
        },
        Commands::Shard { action } => match action {
            ShardAction::Before => {
                let report = service.sharding_before().await.context("Benchmark failed")?;
                emit(format, &report, |r| format!("{}\n{}", r.description, r.metrics.format()))?;
                Ok(true)
            }
            ShardAction::Enable => {
                let report = service.sharding_enable().await;
                info!(state = %service.sharding_state(), "Sharding request finished");
                emit(format, &report, |r| {
                    format!(
                        "{:?}: {}\n{}",
                        r.sharding_result.status,
                        r.sharding_result.message,
                        render_status(&r.sharding_status)
                    )
                })?;
                Ok(!report.sharding_result.is_error())
            }
            ShardAction::After => {
                let report = service.sharding_after().await.context("Benchmark failed")?;
                emit(format, &report, |r| {
                    let status = r.sharding_status.as_ref().map(render_status).unwrap_or_default();
                    format!("{}\n{}\n{}", r.description, r.metrics.format(), status)
                })?;
                Ok(true)
            }
            ShardAction::Status => {
                let status = service.sharding_status().await;
                emit(format, &status, render_status)?;
                Ok(!matches!(status, StatusView::Unavailable { .. }))
            }
            ShardAction::Compare => {
                let report = service
                    .sharding_comparison()
                    .await
                    .context("Sharding comparison failed")?;
                emit(format, &report, |r| r.render_table())?;
                Ok(true)
            }
        },
    }
}

fn render_info(info: &BenchmarkInfo) -> String {
    format!(
        "Fetch-all queries:     {}\nQueries per partition: {}\nPartition values:      {}\nTotal queries per db:  {}",
        info.benchmark_queries,
        info.query_batch_size,
        info.partition_values.join(", "),
        info.total_queries_per_db
    )
}

fn render_status(status: &StatusView) -> String {
    match status {
        StatusView::Observed(s) if s.is_sharded => format!(
            "Sharded on [{}] ({} documents, {} bytes)",
            s.shard_key.join(", "),
            s.count,
            s.size
        ),
        StatusView::Observed(s) => format!("Not sharded ({} documents, {} bytes)", s.count, s.size),
        StatusView::Unavailable { error, .. } => format!("Status unavailable: {}", error),
    }
}

fn emit<T, F>(format: OutputFormat, value: &T, table: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
            println!("{}", text);
        }
        OutputFormat::Table => println!("{}", table(value)),
    }
    Ok(())
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}
