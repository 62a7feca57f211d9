//! Cross-engine query benchmark for rookery
//!
//! Runs one fixed workload against the document, wide-column and key-value
//! stores, and measures the document store before and after sharding.
//!
//! # Modules
//!
//! - [`config`] - settings from TOML and environment
//! - [`registry`] - process-wide connection lifecycle and health probes
//! - [`workload`] - the deterministic operation sequence
//! - [`harness`] - sequential, per-call timed execution of a workload
//! - [`sharding`] - the document store's partitioning state machine
//! - [`comparison`] - the before / enable / after sequence
//! - [`report`] - serialisable result shapes and text rendering
//! - [`service`] - the operations exposed to outer layers
//!
//! # Example
//!
//! ```rust,no_run
//! use rookery_bench::{BenchService, ConnectionRegistry, Settings};
//! use rookery_common::Backend;
//! use std::sync::Arc;
//!
//! # async fn demo() -> rookery_common::Result<()> {
//! let settings = Settings::load(None)?;
//! let registry = Arc::new(ConnectionRegistry::new(&settings));
//! registry.initialize().await;
//!
//! let service = BenchService::new(registry.clone(), &settings.benchmark);
//! let report = service.run_single(Backend::Redis).await?;
//! println!("{}", report.metrics.format());
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod comparison;
pub mod config;
pub mod harness;
pub mod registry;
pub mod report;
pub mod service;
pub mod sharding;
pub mod workload;

pub use comparison::{ComparisonReporter, ComparisonResult, ImprovementMetrics};
pub use config::{BenchmarkSettings, Settings};
pub use harness::{BenchmarkHarness, BenchmarkRun, BenchmarkSample, RunSummary};
pub use registry::{ConnectionRegistry, HealthProbe};
pub use report::{
    ActionStatus, AllBenchmarksReport, BenchmarkInfo, ComparisonReport, EnableReport,
    HealthReport, PhaseReport, ShardingAction, SingleBenchmarkReport, StatusView,
};
pub use service::BenchService;
pub use sharding::{ShardingController, ShardingState};
pub use workload::{Operation, Workload, DEFAULT_PARTITION_VALUES};
