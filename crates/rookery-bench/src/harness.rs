//! Sequential, per-call timed execution of a workload against one store

use rookery_common::{Backend, Record, Result, RookeryError, StoreAdapter};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::workload::{Operation, Workload};

/// One timed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSample {
    /// Latency in milliseconds
    pub time: f64,
    pub operation: String,
    /// 1-based position within the run
    pub query_num: usize,
    /// Label of the run the sample belongs to
    pub label: String,
    /// Number of records the call returned
    pub records: usize,
}

/// Aggregate metrics of a finished run, in milliseconds and operations per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub avg_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub throughput: f64,
    pub total_queries: usize,
}

impl RunSummary {
    pub fn from_samples(samples: &[BenchmarkSample]) -> Self {
        let mut aggregate = RunningAggregate::default();
        for sample in samples {
            aggregate.observe(sample.time);
        }
        aggregate.finalize()
    }

    /// Format as a human-readable block
    pub fn format(&self) -> String {
        format!(
            "Avg:     {:>10.3}ms\n\
             Min:     {:>10.3}ms\n\
             Max:     {:>10.3}ms\n\
             Ops/s:   {:>10.1}\n\
             Queries: {:>10}",
            self.avg_time, self.min_time, self.max_time, self.throughput, self.total_queries
        )
    }

    /// Single-line summary
    pub fn format_short(&self) -> String {
        format!(
            "{:.3}ms avg ({:.3}-{:.3}ms), {:.1} ops/s over {} queries",
            self.avg_time, self.min_time, self.max_time, self.throughput, self.total_queries
        )
    }
}

/// Running count, sum, min and max of observed latencies
#[derive(Debug, Clone, Copy)]
struct RunningAggregate {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for RunningAggregate {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningAggregate {
    fn observe(&mut self, latency: f64) {
        self.count += 1;
        self.sum += latency;
        self.min = self.min.min(latency);
        self.max = self.max.max(latency);
    }

    fn finalize(self) -> RunSummary {
        if self.count == 0 {
            return RunSummary::default();
        }
        let avg = self.sum / self.count as f64;
        RunSummary {
            avg_time: avg,
            min_time: self.min,
            max_time: self.max,
            throughput: if avg > 0.0 { 1000.0 / avg } else { 0.0 },
            total_queries: self.count,
        }
    }
}

/// A finished run. Only the harness constructs one, and only after every
/// operation of the workload succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    backend: Backend,
    label: String,
    samples: Vec<BenchmarkSample>,
    summary: RunSummary,
}

impl BenchmarkRun {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn samples(&self) -> &[BenchmarkSample] {
        &self.samples
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_samples(self) -> Vec<BenchmarkSample> {
        self.samples
    }
}

/// Accumulates samples while a run is in progress
struct RunRecorder {
    backend: Backend,
    label: String,
    samples: Vec<BenchmarkSample>,
    aggregate: RunningAggregate,
}

impl RunRecorder {
    fn new(backend: Backend, label: &str, capacity: usize) -> Self {
        Self {
            backend,
            label: label.to_string(),
            samples: Vec::with_capacity(capacity),
            aggregate: RunningAggregate::default(),
        }
    }

    fn record(&mut self, operation: &Operation, latency: f64, records: usize) {
        self.aggregate.observe(latency);
        self.samples.push(BenchmarkSample {
            time: latency,
            operation: operation.label(),
            query_num: self.samples.len() + 1,
            label: self.label.clone(),
            records,
        });
    }

    fn finish(self) -> BenchmarkRun {
        BenchmarkRun {
            backend: self.backend,
            label: self.label,
            samples: self.samples,
            summary: self.aggregate.finalize(),
        }
    }
}

/// Drives a workload against a store, one call at a time.
///
/// Calls are never overlapped: each is awaited to completion before the next
/// is issued, so a sample measures backend latency only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BenchmarkHarness;

impl BenchmarkHarness {
    pub fn new() -> Self {
        Self
    }

    /// Execute every operation of `workload` and return the finished run.
    ///
    /// The first failing call aborts the run and its error is returned; no
    /// partial run is ever produced.
    pub async fn run(
        &self,
        adapter: &dyn StoreAdapter,
        workload: &Workload,
        label: &str,
    ) -> Result<BenchmarkRun> {
        let backend = adapter.backend();
        let result = match workload.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, Self::execute(adapter, workload, label))
                .await
                .unwrap_or_else(|_| {
                    Err(RookeryError::Timeout(format!(
                        "{} run '{}' exceeded its {}ms deadline",
                        backend.display_name(),
                        label,
                        deadline.as_millis()
                    )))
                }),
            None => Self::execute(adapter, workload, label).await,
        };

        match &result {
            Ok(run) => info!(
                backend = %backend,
                label = %label,
                queries = run.summary.total_queries,
                avg_ms = run.summary.avg_time,
                "Benchmark run completed"
            ),
            Err(e) => warn!(backend = %backend, label = %label, error = %e, "Benchmark run aborted"),
        }
        result
    }

    async fn execute(
        adapter: &dyn StoreAdapter,
        workload: &Workload,
        label: &str,
    ) -> Result<BenchmarkRun> {
        let operations = workload.operations();
        let mut recorder = RunRecorder::new(adapter.backend(), label, operations.len());

        for operation in &operations {
            let started = Instant::now();
            let records = Self::call(adapter, operation).await?;
            let latency = started.elapsed().as_secs_f64() * 1000.0;

            debug!(operation = %operation, latency_ms = latency, records = records.len(), "Query timed");
            recorder.record(operation, latency, records.len());
        }

        Ok(recorder.finish())
    }

    async fn call(adapter: &dyn StoreAdapter, operation: &Operation) -> Result<Vec<Record>> {
        match operation {
            Operation::FetchAll => adapter.fetch_all().await,
            Operation::FetchByPartitionKey(value) => adapter.fetch_by_partition_key(value).await,
        }
    }
}
