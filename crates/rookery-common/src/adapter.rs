//! The uniform read contract every storage backend implements

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Record, Result, RookeryError};

/// The three storage engines holding the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Document store
    MongoDb,
    /// Wide-column store
    Cassandra,
    /// In-memory key-value store
    Redis,
}

impl Backend {
    /// Every backend, in the order benchmarks visit them
    pub const ALL: [Backend; 3] = [Backend::MongoDb, Backend::Cassandra, Backend::Redis];

    /// Stable lowercase identifier used as a map key in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::MongoDb => "mongodb",
            Backend::Cassandra => "cassandra",
            Backend::Redis => "redis",
        }
    }

    /// Product name for human-facing output
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::MongoDb => "MongoDB",
            Backend::Cassandra => "Cassandra",
            Backend::Redis => "Redis",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = RookeryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" | "document" => Ok(Backend::MongoDb),
            "cassandra" | "cql" | "column" => Ok(Backend::Cassandra),
            "redis" | "kv" | "keyvalue" => Ok(Backend::Redis),
            _ => Err(RookeryError::Config(format!(
                "Unknown backend: {}. Use 'mongodb', 'cassandra' or 'redis'.",
                s
            ))),
        }
    }
}

/// Read access to one backend over exactly one owned connection handle.
///
/// Both fetch operations return fully materialised results so that timing a
/// call captures the whole result latency. Partition keys are never validated
/// against a known set: an unknown key yields an empty result.
///
/// Implementations must tolerate concurrent calls on a shared instance.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Which engine this adapter talks to
    fn backend(&self) -> Backend;

    /// Establish the connection, replacing any previous one
    async fn connect(&self) -> Result<()>;

    /// Drop the connection; later calls fail with `BackendUnavailable`
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Run the backend's lightweight liveness command
    async fn ping(&self) -> Result<()>;

    /// Every record in the dataset
    async fn fetch_all(&self) -> Result<Vec<Record>>;

    /// Every record whose partition field equals `key`
    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>>;
}

/// Error returned by adapters that have no live connection
pub fn not_connected(backend: Backend) -> RookeryError {
    RookeryError::BackendUnavailable(format!("{} is not connected", backend.display_name()))
}
