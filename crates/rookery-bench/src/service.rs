//! The benchmark operations exposed to outer layers

use rookery_common::{Backend, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::comparison::{ComparisonReporter, AFTER_LABEL, BEFORE_LABEL};
use crate::config::BenchmarkSettings;
use crate::harness::BenchmarkHarness;
use crate::registry::ConnectionRegistry;
use crate::report::{
    AllBenchmarksReport, BenchmarkInfo, ComparisonReport, EnableReport, HealthReport, PhaseReport,
    ShardingAction, SingleBenchmarkReport, StatusView,
};
use crate::sharding::{ShardingController, ShardingState};
use crate::workload::Workload;

/// Facade over the registry, harness, sharding controller and comparison.
///
/// Safe to share between concurrent callers: runs own their results, and
/// the only shared mutable state is the controller's `ShardingState`.
pub struct BenchService {
    registry: Arc<ConnectionRegistry>,
    controller: ShardingController,
    harness: BenchmarkHarness,
    reporter: ComparisonReporter,
    workload: Workload,
    shard_key: String,
}

impl BenchService {
    pub fn new(registry: Arc<ConnectionRegistry>, settings: &BenchmarkSettings) -> Self {
        let controller = ShardingController::new(registry.partition_admin());
        Self {
            registry,
            controller,
            harness: BenchmarkHarness::new(),
            reporter: ComparisonReporter::new(settings.settle_interval()),
            workload: settings.workload(),
            shard_key: settings.shard_key.clone(),
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn sharding_state(&self) -> ShardingState {
        self.controller.state()
    }

    pub async fn run_single(&self, backend: Backend) -> Result<SingleBenchmarkReport> {
        let adapter = self.registry.adapter(backend);
        let run = self
            .harness
            .run(adapter.as_ref(), &self.workload, backend.as_str())
            .await?;
        Ok(SingleBenchmarkReport::from_run(run))
    }

    /// Benchmark each backend in turn. One failing backend fails the whole call.
    pub async fn run_all(&self) -> Result<AllBenchmarksReport> {
        let started = Instant::now();
        let mut runs = Vec::with_capacity(Backend::ALL.len());
        for backend in Backend::ALL {
            let adapter = self.registry.adapter(backend);
            runs.push(
                self.harness
                    .run(adapter.as_ref(), &self.workload, backend.as_str())
                    .await?,
            );
        }
        let total_duration = started.elapsed().as_secs_f64();
        info!(total_duration, "All benchmarks completed");
        Ok(AllBenchmarksReport::from_runs(runs, total_duration))
    }

    pub async fn sharding_before(&self) -> Result<PhaseReport> {
        self.controller.ensure_query_indexes().await;
        let adapter = self.registry.adapter(Backend::MongoDb);
        let run = self
            .harness
            .run(adapter.as_ref(), &self.workload, BEFORE_LABEL)
            .await?;
        Ok(PhaseReport::before(run))
    }

    /// Rejections are reported in the returned action, not as an `Err`
    pub async fn sharding_enable(&self) -> EnableReport {
        let action = ShardingAction::from_result(&self.controller.enable(&self.shard_key).await);
        let status = self.sharding_status().await;
        EnableReport::new(action, status)
    }

    pub async fn sharding_after(&self) -> Result<PhaseReport> {
        let adapter = self.registry.adapter(Backend::MongoDb);
        let run = self
            .harness
            .run(adapter.as_ref(), &self.workload, AFTER_LABEL)
            .await?;
        let status = self.sharding_status().await;
        Ok(PhaseReport::after(run, status))
    }

    pub async fn sharding_status(&self) -> StatusView {
        StatusView::from_result(self.controller.status().await)
    }

    pub async fn sharding_comparison(&self) -> Result<ComparisonReport> {
        let adapter = self.registry.adapter(Backend::MongoDb);
        let result = self
            .reporter
            .compare(adapter.as_ref(), &self.controller, &self.workload, &self.shard_key)
            .await?;
        Ok(ComparisonReport::from_result(&result, &self.shard_key))
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport::from_probe(&self.registry.health_probe().await)
    }

    pub fn info(&self) -> BenchmarkInfo {
        BenchmarkInfo::from_workload(&self.workload)
    }
}
