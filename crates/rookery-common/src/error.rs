//! Error types for rookery

use thiserror::Error;

/// Result type alias for rookery operations
pub type Result<T> = std::result::Result<T, RookeryError>;

/// Unified error type for all rookery operations
///
/// "Already partitioned" is deliberately absent: it is a success outcome of
/// enabling partitioning (see [`crate::PartitionOutcome`]), not a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RookeryError {
    /// No live connection to the backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Protocol or driver level failure during a call
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The backend rejected a partitioning request
    #[error("Partitioning failed: {0}")]
    PartitioningFailed(String),

    /// Another request already holds the resource; nothing was attempted
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RookeryError {
    /// Returns true if the backend could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RookeryError::BackendUnavailable(_) | RookeryError::Connection(_)
        )
    }

    /// Returns true if this error is potentially retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RookeryError::Timeout(_)
                | RookeryError::BackendUnavailable(_)
                | RookeryError::PartitioningFailed(_)
                | RookeryError::Busy(_)
        )
    }
}

impl From<serde_json::Error> for RookeryError {
    fn from(err: serde_json::Error) -> Self {
        RookeryError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for RookeryError {
    fn from(err: mongodb::error::Error) -> Self {
        RookeryError::QueryFailed(format!("MongoDB: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for RookeryError {
    fn from(err: bson::de::Error) -> Self {
        RookeryError::Serialization(format!("BSON deserialization error: {}", err))
    }
}

// Redis-specific error conversions (when redis-errors feature is enabled)
#[cfg(feature = "redis-errors")]
impl From<redis::RedisError> for RookeryError {
    fn from(err: redis::RedisError) -> Self {
        RookeryError::QueryFailed(format!("Redis: {}", err))
    }
}

#[cfg(feature = "redis-errors")]
impl From<deadpool_redis::PoolError> for RookeryError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        RookeryError::BackendUnavailable(format!("Redis pool: {}", err))
    }
}

// Cassandra-specific error conversions (when cassandra-errors feature is enabled)
#[cfg(feature = "cassandra-errors")]
impl From<scylla::errors::ExecutionError> for RookeryError {
    fn from(err: scylla::errors::ExecutionError) -> Self {
        RookeryError::QueryFailed(format!("Cassandra: {}", err))
    }
}

#[cfg(feature = "cassandra-errors")]
impl From<scylla::errors::NewSessionError> for RookeryError {
    fn from(err: scylla::errors::NewSessionError) -> Self {
        RookeryError::Connection(format!("Cassandra: {}", err))
    }
}
