//! Before / enable / after measurement of the document store

use rookery_common::{Result, StoreAdapter};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::harness::{BenchmarkHarness, BenchmarkRun, RunSummary};
use crate::report::ShardingAction;
use crate::sharding::ShardingController;
use crate::workload::Workload;

pub const BEFORE_LABEL: &str = "before";
pub const AFTER_LABEL: &str = "after";

/// Relative change from the "before" run to the "after" run, in percent.
/// Positive values mean the after run was faster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImprovementMetrics {
    pub avg_time_improvement_percent: f64,
    pub throughput_improvement_percent: f64,
}

impl ImprovementMetrics {
    pub fn between(before: &RunSummary, after: &RunSummary) -> Self {
        let avg_time_improvement_percent = if before.avg_time == 0.0 {
            0.0
        } else {
            (before.avg_time - after.avg_time) / before.avg_time * 100.0
        };
        let throughput_improvement_percent = if before.throughput == 0.0 {
            0.0
        } else {
            (after.throughput - before.throughput) / before.throughput * 100.0
        };
        Self {
            avg_time_improvement_percent,
            throughput_improvement_percent,
        }
    }
}

/// Both raw runs, what enabling sharding did, and the derived improvement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub before: BenchmarkRun,
    pub sharding_action: ShardingAction,
    pub after: BenchmarkRun,
    pub improvement: ImprovementMetrics,
}

/// Runs the before / enable / settle / after sequence.
///
/// The settle pause is a fixed wait, not a readiness poll: if the cluster takes
/// longer than the interval to apply the new metadata, the "after" run may
/// still measure the unsharded layout.
#[derive(Debug, Clone)]
pub struct ComparisonReporter {
    harness: BenchmarkHarness,
    settle_interval: Duration,
}

impl ComparisonReporter {
    pub fn new(settle_interval: Duration) -> Self {
        Self {
            harness: BenchmarkHarness::new(),
            settle_interval,
        }
    }

    pub fn settle_interval(&self) -> Duration {
        self.settle_interval
    }

    /// A failing before or after run aborts the whole comparison. A rejected
    /// sharding request does not; it is reported in `sharding_action`.
    pub async fn compare(
        &self,
        adapter: &dyn StoreAdapter,
        controller: &ShardingController,
        workload: &Workload,
        key: &str,
    ) -> Result<ComparisonResult> {
        controller.ensure_query_indexes().await;

        let before = self.harness.run(adapter, workload, BEFORE_LABEL).await?;

        let sharding_action = ShardingAction::from_result(&controller.enable(key).await);

        if !self.settle_interval.is_zero() {
            info!(
                settle_ms = self.settle_interval.as_millis() as u64,
                "Waiting for sharding metadata to settle"
            );
            tokio::time::sleep(self.settle_interval).await;
        }

        let after = self.harness.run(adapter, workload, AFTER_LABEL).await?;
        let improvement = ImprovementMetrics::between(before.summary(), after.summary());

        info!(
            backend = %adapter.backend(),
            action = ?sharding_action.status,
            avg_time_improvement_percent = improvement.avg_time_improvement_percent,
            "Sharding comparison completed"
        );

        Ok(ComparisonResult {
            before,
            sharding_action,
            after,
            improvement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(avg_time: f64) -> RunSummary {
        RunSummary {
            avg_time,
            min_time: avg_time,
            max_time: avg_time,
            throughput: if avg_time > 0.0 { 1000.0 / avg_time } else { 0.0 },
            total_queries: 5,
        }
    }

    #[test]
    fn test_improvement_when_faster() {
        let metrics = ImprovementMetrics::between(&summary(10.0), &summary(5.0));
        assert_eq!(metrics.avg_time_improvement_percent, 50.0);
        assert_eq!(metrics.throughput_improvement_percent, 100.0);
    }

    #[test]
    fn test_improvement_when_slower() {
        let metrics = ImprovementMetrics::between(&summary(4.0), &summary(5.0));
        assert!((metrics.avg_time_improvement_percent + 25.0).abs() < 1e-9);
        assert!((metrics.throughput_improvement_percent + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_improvement_guards_zero_baseline() {
        let metrics = ImprovementMetrics::between(&summary(0.0), &summary(5.0));
        assert_eq!(metrics, ImprovementMetrics::default());
    }
}
