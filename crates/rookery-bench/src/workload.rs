//! The fixed operation sequence a benchmark run executes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::BenchmarkSettings;

/// The three species present in the dataset
pub const DEFAULT_PARTITION_VALUES: [&str; 3] = ["Adelie", "Chinstrap", "Gentoo"];

/// One call against a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    FetchAll,
    FetchByPartitionKey(String),
}

impl Operation {
    /// Label recorded on every sample of this operation
    pub fn label(&self) -> String {
        match self {
            Operation::FetchAll => "fetch_all".to_string(),
            Operation::FetchByPartitionKey(value) => format!("fetch_by_partition_key_{}", value),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// N fetch-all calls, then M partition-key calls for each partition value in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    fetch_all_queries: usize,
    queries_per_partition: usize,
    partition_values: Vec<String>,
    deadline: Option<Duration>,
}

impl Workload {
    pub fn new(
        fetch_all_queries: usize,
        queries_per_partition: usize,
        partition_values: Vec<String>,
    ) -> Self {
        Self {
            fetch_all_queries,
            queries_per_partition,
            partition_values,
            deadline: None,
        }
    }

    pub fn from_settings(settings: &BenchmarkSettings) -> Self {
        settings.workload()
    }

    /// Bound the whole run; exceeding it aborts the run with a timeout
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn fetch_all_queries(&self) -> usize {
        self.fetch_all_queries
    }

    pub fn queries_per_partition(&self) -> usize {
        self.queries_per_partition
    }

    pub fn partition_values(&self) -> &[String] {
        &self.partition_values
    }

    /// Every operation of the run, in execution order
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(self.total_queries());
        ops.extend(std::iter::repeat(Operation::FetchAll).take(self.fetch_all_queries));
        for value in &self.partition_values {
            ops.extend(
                std::iter::repeat(Operation::FetchByPartitionKey(value.clone()))
                    .take(self.queries_per_partition),
            );
        }
        ops
    }

    pub fn total_queries(&self) -> usize {
        self.fetch_all_queries + self.queries_per_partition * self.partition_values.len()
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::new(
            10,
            5,
            DEFAULT_PARTITION_VALUES.iter().map(|v| v.to_string()).collect(),
        )
    }
}
