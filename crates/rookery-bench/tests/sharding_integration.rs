// Sharding lifecycle, comparison, and the service result shapes

mod common;

use common::{fast_settings, fixture, fixture_with, MemoryStore};
use rookery_bench::{
    ActionStatus, BenchService, ComparisonReporter, ShardingController, ShardingState, StatusView,
    Workload,
};
use rookery_common::{Backend, RookeryError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn service(f: &common::Fixture) -> BenchService {
    BenchService::new(f.registry.clone(), &fast_settings().benchmark)
}

#[tokio::test]
async fn test_enable_twice_reports_already_sharded() {
    let f = fixture();
    let service = service(&f);

    let first = service.sharding_enable().await;
    assert_eq!(first.sharding_result.status, ActionStatus::Success);
    assert_eq!(service.sharding_state(), ShardingState::Sharded("species".into()));
    assert!(first.sharding_status.is_sharded());

    let second = service.sharding_enable().await;
    assert_eq!(second.sharding_result.status, ActionStatus::AlreadySharded);
    assert_eq!(f.document.enable_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_reported_already_sharded_is_success() {
    let f = fixture();

    // A previous process already sharded the collection.
    let earlier = ShardingController::new(f.registry.partition_admin());
    earlier.enable("species").await.unwrap();

    let service = service(&f);
    let report = service.sharding_enable().await;
    assert_eq!(report.sharding_result.status, ActionStatus::AlreadySharded);
    assert_eq!(report.sharding_result.shard_key.as_deref(), Some("species"));
    assert_eq!(service.sharding_state(), ShardingState::Sharded("species".into()));
}

#[tokio::test]
async fn test_rejected_enable_sets_error_and_can_retry() {
    let f = fixture();
    let service = service(&f);
    f.document.reject_sharding(true);

    let report = service.sharding_enable().await;
    assert_eq!(report.sharding_result.status, ActionStatus::Error);
    assert!(matches!(service.sharding_state(), ShardingState::Error(_)));
    assert!(f.document.sharded_on().is_none());

    f.document.reject_sharding(false);
    let report = service.sharding_enable().await;
    assert_eq!(report.sharding_result.status, ActionStatus::Success);
    assert_eq!(f.document.sharded_on().as_deref(), Some("species"));
}

#[tokio::test]
async fn test_concurrent_enable_has_single_writer() {
    let f = fixture();
    let controller = Arc::new(ShardingController::new(f.registry.partition_admin()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.enable("species").await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert!(succeeded >= 1);
    assert_eq!(controller.state(), ShardingState::Sharded("species".into()));
    assert_eq!(f.document.enable_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_comparison_end_to_end() {
    let f = fixture();
    let report = service(&f).sharding_comparison().await.unwrap();

    assert_eq!(report.comparison.before_sharding.queries, 5);
    assert_eq!(report.comparison.after_sharding.queries, 5);
    assert_eq!(report.comparison.sharding_action.status, ActionStatus::Success);
    assert_eq!(report.comparison_table.metric.len(), 4);
    assert!(f.document.index_calls.load(Ordering::SeqCst) >= 2);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["comparison"]["sharding_action"]["status"], "success");
    assert!(value["improvement_metrics"]["avg_time_improvement_percent"].is_number());
    assert!(value["improvement_metrics"]["throughput_improvement_percent"].is_number());
    assert!(value["improvement_metrics"]["note"].is_string());
    assert!(value["timestamp"].is_string());
}

#[tokio::test]
async fn test_failed_before_run_skips_sharding() {
    let f = fixture_with(
        MemoryStore::new(Backend::MongoDb).connected().failing_after(1),
        MemoryStore::new(Backend::Cassandra).connected(),
        MemoryStore::new(Backend::Redis).connected(),
    );

    let err = service(&f).sharding_comparison().await.unwrap_err();
    assert!(matches!(err, RookeryError::QueryFailed(_)));
    assert_eq!(f.document.enable_calls.load(Ordering::SeqCst), 0);
    assert!(f.document.sharded_on().is_none());
}

#[tokio::test]
async fn test_rejected_sharding_still_compares() {
    let f = fixture();
    f.document.reject_sharding(true);

    let report = service(&f).sharding_comparison().await.unwrap();
    assert_eq!(report.comparison.sharding_action.status, ActionStatus::Error);
    assert_eq!(report.comparison.after_sharding.queries, 5);
}

#[tokio::test]
async fn test_reporter_waits_settle_interval() {
    let f = fixture();
    let controller = ShardingController::new(f.registry.partition_admin());
    let reporter = ComparisonReporter::new(Duration::from_millis(50));
    let adapter = f.registry.adapter(Backend::MongoDb);

    let started = std::time::Instant::now();
    let result = reporter
        .compare(adapter.as_ref(), &controller, &Workload::new(1, 0, Vec::new()), "species")
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(result.before.label(), "before");
    assert_eq!(result.after.label(), "after");
    assert_eq!(result.before.samples().len(), result.after.samples().len());
}

#[tokio::test]
async fn test_phase_reports() {
    let f = fixture();
    let service = service(&f);

    let before = service.sharding_before().await.unwrap();
    assert_eq!(before.phase, "before_sharding");
    assert_eq!(before.metrics.total_queries, 5);
    assert!(before.sharding_status.is_none());

    service.sharding_enable().await;

    let after = service.sharding_after().await.unwrap();
    assert_eq!(after.phase, "after_sharding");
    match after.sharding_status {
        Some(StatusView::Observed(status)) => {
            assert!(status.is_sharded);
            assert_eq!(status.shard_key, vec!["species".to_string()]);
            assert_eq!(status.count, 10);
        }
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_status_does_not_change_state() {
    let f = fixture();
    let service = service(&f);

    let status = service.sharding_status().await;
    assert!(!status.is_sharded());
    assert_eq!(service.sharding_state(), ShardingState::Unsharded);
}

#[tokio::test]
async fn test_run_single_and_run_all_shapes() {
    let f = fixture();
    let service = service(&f);

    let single = service.run_single(Backend::Redis).await.unwrap();
    assert_eq!(single.database, "Redis");
    assert_eq!(single.metrics.total_queries, 5);
    assert_eq!(single.detailed_results.len(), 5);

    let all = service.run_all().await.unwrap();
    assert_eq!(all.benchmarks.len(), 3);
    for backend in Backend::ALL {
        assert_eq!(all.benchmarks[&backend].total_queries, 5);
        assert_eq!(all.detailed_results[&backend].len(), 5);
    }
    assert!(all.total_duration >= 0.0);

    let value = serde_json::to_value(&all).unwrap();
    assert!(value["benchmarks"]["mongodb"]["avg_time"].is_number());
    assert!(value["detailed_results"]["redis"][0]["operation"].is_string());
}

#[tokio::test]
async fn test_run_all_fails_when_one_backend_fails() {
    let f = fixture_with(
        MemoryStore::new(Backend::MongoDb).connected(),
        MemoryStore::new(Backend::Cassandra),
        MemoryStore::new(Backend::Redis).connected(),
    );
    let err = service(&f).run_all().await.unwrap_err();
    assert!(matches!(err, RookeryError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_health_and_info() {
    let f = fixture_with(
        MemoryStore::new(Backend::MongoDb).connected(),
        MemoryStore::new(Backend::Cassandra),
        MemoryStore::new(Backend::Redis).connected(),
    );
    let service = service(&f);

    let health = serde_json::to_value(service.health().await).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["databases"]["mongodb"], "connected");
    assert_eq!(health["databases"]["cassandra"], "disconnected");

    let info = service.info();
    assert_eq!(info.benchmark_queries, 2);
    assert_eq!(info.query_batch_size, 1);
    assert_eq!(info.total_queries_per_db, 5);

    let service = service.with_workload(Workload::default());
    assert_eq!(service.info().total_queries_per_db, 25);
}
