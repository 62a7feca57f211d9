//! Result shapes handed to outer layers, and their text rendering
//!
//! Every report is built once, stamped with an RFC 3339 timestamp at
//! construction, and never modified afterwards.

use chrono::{SecondsFormat, Utc};
use rookery_common::{Backend, PartitionOutcome, PartitionStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::comparison::{ComparisonResult, ImprovementMetrics};
use crate::harness::{BenchmarkRun, BenchmarkSample, RunSummary};
use crate::registry::HealthProbe;
use crate::workload::Workload;

pub const BEFORE_PHASE: &str = "before_sharding";
pub const AFTER_PHASE: &str = "after_sharding";

const IMPROVEMENT_NOTE: &str = "Positive improvement % means after sharding is faster";
const TABLE_METRICS: [&str; 4] = [
    "Avg Time (ms)",
    "Min Time (ms)",
    "Max Time (ms)",
    "Throughput (req/s)",
];

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    AlreadySharded,
    Error,
}

/// Outcome of one sharding request, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingAction {
    pub status: ActionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShardingAction {
    pub fn from_result(result: &Result<PartitionOutcome>) -> Self {
        match result {
            Ok(PartitionOutcome::Enabled { key }) => Self {
                status: ActionStatus::Success,
                message: format!("Sharding enabled with key: {}", key),
                shard_key: Some(key.clone()),
                error: None,
            },
            Ok(PartitionOutcome::AlreadyPartitioned { key }) => Self {
                status: ActionStatus::AlreadySharded,
                message: "Collection is already sharded".to_string(),
                shard_key: Some(key.clone()),
                error: None,
            },
            Err(e) => Self {
                status: ActionStatus::Error,
                message: e.to_string(),
                shard_key: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ActionStatus::Error
    }
}

/// Partitioning metadata as observed, or why it could not be read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusView {
    Observed(PartitionStatus),
    Unavailable { is_sharded: bool, error: String },
}

impl StatusView {
    pub fn from_result(result: Result<PartitionStatus>) -> Self {
        match result {
            Ok(status) => StatusView::Observed(status),
            Err(e) => StatusView::Unavailable {
                is_sharded: false,
                error: e.to_string(),
            },
        }
    }

    pub fn is_sharded(&self) -> bool {
        match self {
            StatusView::Observed(status) => status.is_sharded,
            StatusView::Unavailable { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleBenchmarkReport {
    pub database: String,
    pub metrics: RunSummary,
    pub detailed_results: Vec<BenchmarkSample>,
    pub timestamp: String,
}

impl SingleBenchmarkReport {
    pub fn from_run(run: BenchmarkRun) -> Self {
        let database = run.backend().display_name().to_string();
        let metrics = *run.summary();
        Self {
            database,
            metrics,
            detailed_results: run.into_samples(),
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllBenchmarksReport {
    pub benchmarks: BTreeMap<Backend, RunSummary>,
    pub detailed_results: BTreeMap<Backend, Vec<BenchmarkSample>>,
    /// Wall-clock seconds for all runs together
    pub total_duration: f64,
    pub timestamp: String,
}

impl AllBenchmarksReport {
    pub fn from_runs(runs: Vec<BenchmarkRun>, total_duration: f64) -> Self {
        let mut benchmarks = BTreeMap::new();
        let mut detailed_results = BTreeMap::new();
        for run in runs {
            let backend = run.backend();
            benchmarks.insert(backend, *run.summary());
            detailed_results.insert(backend, run.into_samples());
        }
        Self {
            benchmarks,
            detailed_results,
            total_duration,
            timestamp: timestamp(),
        }
    }

    /// Side-by-side table, each row relative to the first backend
    pub fn render_table(&self) -> String {
        let baseline = self.benchmarks.iter().next();
        let baseline_avg = baseline.map(|(_, s)| s.avg_time).unwrap_or(0.0);

        let mut lines = vec![
            "=".repeat(75),
            format!(
                "{:<20} {:>12} {:>12} {:>12} {:>15}",
                "Database", "Avg (ms)", "Max (ms)", "Ops/s", "vs Baseline"
            ),
            "-".repeat(75),
        ];

        for (backend, summary) in &self.benchmarks {
            let vs_baseline = if baseline.map(|(b, _)| b) == Some(backend) {
                "(baseline)".to_string()
            } else if baseline_avg == 0.0 || summary.avg_time == 0.0 {
                "-".to_string()
            } else {
                let ratio = summary.avg_time / baseline_avg;
                if ratio < 1.0 {
                    format!("{:.2}x faster", 1.0 / ratio)
                } else {
                    format!("{:.2}x slower", ratio)
                }
            };
            lines.push(format!(
                "{:<20} {:>12.3} {:>12.3} {:>12.1} {:>15}",
                backend.display_name(),
                summary.avg_time,
                summary.max_time,
                summary.throughput,
                vs_baseline
            ));
        }

        lines.push("=".repeat(75));
        lines.push(format!("Total duration: {:.3}s", self.total_duration));
        lines.join("\n")
    }
}

/// One side of the sharding comparison run on its own
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: String,
    pub description: String,
    pub metrics: RunSummary,
    pub detailed_results: Vec<BenchmarkSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharding_status: Option<StatusView>,
    pub timestamp: String,
}

impl PhaseReport {
    pub fn before(run: BenchmarkRun) -> Self {
        Self::build(
            BEFORE_PHASE,
            "Benchmark without sharding enabled - single node operation",
            run,
            None,
        )
    }

    pub fn after(run: BenchmarkRun, status: StatusView) -> Self {
        Self::build(
            AFTER_PHASE,
            "Benchmark with sharding enabled - distributed operation",
            run,
            Some(status),
        )
    }

    fn build(
        phase: &str,
        description: &str,
        run: BenchmarkRun,
        sharding_status: Option<StatusView>,
    ) -> Self {
        let metrics = *run.summary();
        Self {
            phase: phase.to_string(),
            description: description.to_string(),
            metrics,
            detailed_results: run.into_samples(),
            sharding_status,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnableReport {
    pub action: String,
    pub sharding_result: ShardingAction,
    pub sharding_status: StatusView,
    pub timestamp: String,
}

impl EnableReport {
    pub fn new(sharding_result: ShardingAction, sharding_status: StatusView) -> Self {
        Self {
            action: "enable_sharding".to_string(),
            sharding_result,
            sharding_status,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub description: String,
    pub metrics: RunSummary,
    pub queries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonBody {
    pub before_sharding: PhaseSummary,
    pub sharding_action: ShardingAction,
    pub after_sharding: PhaseSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImprovementReport {
    #[serde(flatten)]
    pub metrics: ImprovementMetrics,
    pub note: String,
}

/// Metric labels with before and after values rounded to two decimals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub metric: Vec<String>,
    pub before: Vec<f64>,
    pub after: Vec<f64>,
}

impl ComparisonTable {
    pub fn new(before: &RunSummary, after: &RunSummary) -> Self {
        let row = |s: &RunSummary| {
            vec![
                round2(s.avg_time),
                round2(s.min_time),
                round2(s.max_time),
                round2(s.throughput),
            ]
        };
        Self {
            metric: TABLE_METRICS.iter().map(|m| m.to_string()).collect(),
            before: row(before),
            after: row(after),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "=".repeat(60),
            format!("{:<22} {:>12} {:>12} {:>10}", "Metric", "Before", "After", "Change"),
            "-".repeat(60),
        ];
        for ((metric, before), after) in self.metric.iter().zip(&self.before).zip(&self.after) {
            let change = if *before == 0.0 {
                "-".to_string()
            } else {
                format!("{:+.1}%", (after - before) / before * 100.0)
            };
            lines.push(format!(
                "{:<22} {:>12.2} {:>12.2} {:>10}",
                metric, before, after, change
            ));
        }
        lines.push("=".repeat(60));
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub comparison: ComparisonBody,
    pub improvement_metrics: ImprovementReport,
    pub comparison_table: ComparisonTable,
    pub timestamp: String,
}

impl ComparisonReport {
    pub fn from_result(result: &ComparisonResult, shard_key: &str) -> Self {
        let before = result.before.summary();
        let after = result.after.summary();
        Self {
            comparison: ComparisonBody {
                before_sharding: PhaseSummary {
                    description: "Single node operation without sharding".to_string(),
                    metrics: *before,
                    queries: result.before.samples().len(),
                },
                sharding_action: result.sharding_action.clone(),
                after_sharding: PhaseSummary {
                    description: format!(
                        "Distributed operation with sharding on '{}' key",
                        shard_key
                    ),
                    metrics: *after,
                    queries: result.after.samples().len(),
                },
            },
            improvement_metrics: ImprovementReport {
                metrics: result.improvement,
                note: IMPROVEMENT_NOTE.to_string(),
            },
            comparison_table: ComparisonTable::new(before, after),
            timestamp: timestamp(),
        }
    }

    pub fn render_table(&self) -> String {
        let action = &self.comparison.sharding_action;
        let improvement = &self.improvement_metrics.metrics;
        format!(
            "Sharding: {:?} - {}\n{}\nAvg time improvement:   {:+.2}%\nThroughput improvement: {:+.2}%\n{}",
            action.status,
            action.message,
            self.comparison_table.render(),
            improvement.avg_time_improvement_percent,
            improvement.throughput_improvement_percent,
            self.improvement_metrics.note
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub databases: BTreeMap<Backend, ConnectionState>,
}

impl HealthReport {
    pub fn from_probe(probe: &HealthProbe) -> Self {
        let databases = probe
            .iter()
            .map(|(backend, alive)| {
                let state = if alive {
                    ConnectionState::Connected
                } else {
                    ConnectionState::Disconnected
                };
                (backend, state)
            })
            .collect();
        Self {
            status: if probe.all_alive() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            databases,
        }
    }

    pub fn render_table(&self) -> String {
        let mut lines = vec![format!("Status: {:?}", self.status)];
        for (backend, state) in &self.databases {
            lines.push(format!("  {:<12} {:?}", backend.display_name(), state));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkInfo {
    pub benchmark_queries: usize,
    pub query_batch_size: usize,
    pub total_queries_per_db: usize,
    pub partition_values: Vec<String>,
    pub description: String,
}

impl BenchmarkInfo {
    pub fn from_workload(workload: &Workload) -> Self {
        Self {
            benchmark_queries: workload.fetch_all_queries(),
            query_batch_size: workload.queries_per_partition(),
            total_queries_per_db: workload.total_queries(),
            partition_values: workload.partition_values().to_vec(),
            description: "Database benchmarking compares query performance across MongoDB, Cassandra, and Redis".to_string(),
        }
    }
}
