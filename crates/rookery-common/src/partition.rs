//! Partitioning administration for the document store

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Successful outcomes of a partitioning request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionOutcome {
    /// The backend partitioned the collection on `key`
    Enabled { key: String },
    /// The backend reported the collection was already partitioned
    AlreadyPartitioned { key: String },
}

impl PartitionOutcome {
    pub fn key(&self) -> &str {
        match self {
            PartitionOutcome::Enabled { key } | PartitionOutcome::AlreadyPartitioned { key } => {
                key
            }
        }
    }
}

/// What the backend currently reports about the collection's partitioning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStatus {
    pub is_sharded: bool,
    /// Fields making up the shard key; empty when unsharded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub shard_key: Vec<String>,
    /// Number of documents in the collection
    pub count: u64,
    /// Uncompressed data size in bytes
    pub size: u64,
}

/// Administrative commands for a backend that supports horizontal partitioning.
///
/// Only the document store implements this.
#[async_trait]
pub trait PartitionAdmin: Send + Sync {
    /// Create a single-field ascending index; an existing index is a no-op
    async fn ensure_index(&self, field: &str) -> Result<()>;

    /// Create the secondary indexes the benchmark queries rely on.
    /// Returns the names of the indexes ensured.
    async fn ensure_query_indexes(&self) -> Result<Vec<String>>;

    /// Ask the backend to partition the collection on `key`
    async fn enable_partitioning(&self, key: &str) -> Result<PartitionOutcome>;

    /// Read the backend's current partitioning metadata, once
    async fn partition_status(&self) -> Result<PartitionStatus>;
}
