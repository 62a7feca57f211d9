//! Partitioning lifecycle of the document store
//!
//! ```text
//! Unsharded ──enable──▶ ShardingInProgress ──ok────▶ Sharded(key)
//!     ▲                        │
//!     │                        └──failure──▶ Error(cause) ──enable──▶ ...
//! ```
//!
//! `Sharded` is terminal. The state lock guards transitions only and is never
//! held while a backend command runs.

use parking_lot::Mutex;
use rookery_common::{PartitionAdmin, PartitionOutcome, PartitionStatus, Result, RookeryError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ShardingState {
    Unsharded,
    ShardingInProgress,
    Sharded(String),
    Error(String),
}

impl ShardingState {
    pub fn is_sharded(&self) -> bool {
        matches!(self, ShardingState::Sharded(_))
    }
}

impl fmt::Display for ShardingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingState::Unsharded => write!(f, "unsharded"),
            ShardingState::ShardingInProgress => write!(f, "sharding in progress"),
            ShardingState::Sharded(key) => write!(f, "sharded on {}", key),
            ShardingState::Error(cause) => write!(f, "error: {}", cause),
        }
    }
}

/// Marks an `enable` whose state is `ShardingInProgress`. If the call is
/// dropped before it settles, the state moves to `Error` so a later `enable`
/// can retry; the backend may or may not have applied the command.
struct InFlight<'a> {
    state: &'a Mutex<ShardingState>,
    key: &'a str,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<ShardingState>, key: &'a str) -> Self {
        Self {
            state,
            key,
            settled: false,
        }
    }

    fn settle(mut self, next: ShardingState) {
        *self.state.lock() = next;
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        if *state == ShardingState::ShardingInProgress {
            *state = ShardingState::Error("enable cancelled before completion".to_string());
        }
        warn!(key = self.key, "Sharding request cancelled");
    }
}

/// Owns the document store's `ShardingState` and issues partitioning commands
pub struct ShardingController {
    admin: Arc<dyn PartitionAdmin>,
    state: Mutex<ShardingState>,
}

impl ShardingController {
    pub fn new(admin: Arc<dyn PartitionAdmin>) -> Self {
        Self {
            admin,
            state: Mutex::new(ShardingState::Unsharded),
        }
    }

    pub fn state(&self) -> ShardingState {
        self.state.lock().clone()
    }

    /// Partition the collection on `key`.
    ///
    /// An index on `key` is ensured first. "Already sharded" comes back as
    /// `PartitionOutcome::AlreadyPartitioned`, never as an error. A call made
    /// while another is in flight gets `Busy` and leaves the state alone. Any
    /// failure, or dropping the call midway, moves the state to `Error`, from
    /// which `enable` may be retried.
    pub async fn enable(&self, key: &str) -> Result<PartitionOutcome> {
        if key.is_empty() {
            return Err(RookeryError::Config("Shard key must not be empty".to_string()));
        }

        let in_flight = {
            let mut state = self.state.lock();
            match &*state {
                ShardingState::Sharded(existing) => {
                    return Ok(PartitionOutcome::AlreadyPartitioned {
                        key: existing.clone(),
                    });
                }
                ShardingState::ShardingInProgress => {
                    return Err(RookeryError::Busy(
                        "Another sharding request is in progress".to_string(),
                    ));
                }
                ShardingState::Unsharded | ShardingState::Error(_) => {
                    *state = ShardingState::ShardingInProgress;
                }
            }
            InFlight::new(&self.state, key)
        };
        info!(key, "Enabling sharding");

        let result = self.apply(key).await;

        match &result {
            Ok(outcome) => {
                in_flight.settle(ShardingState::Sharded(outcome.key().to_string()));
                info!(key = outcome.key(), outcome = ?outcome, "Sharding enabled");
            }
            Err(e) => {
                in_flight.settle(ShardingState::Error(e.to_string()));
                warn!(key, error = %e, "Sharding failed");
            }
        }
        result
    }

    async fn apply(&self, key: &str) -> Result<PartitionOutcome> {
        self.admin.ensure_index(key).await.map_err(|e| match e {
            RookeryError::QueryFailed(cause) => {
                RookeryError::PartitioningFailed(format!("index on {}: {}", key, cause))
            }
            other => other,
        })?;
        self.admin.enable_partitioning(key).await
    }

    /// What the backend reports right now. Does not retry and does not touch
    /// the controller's state, so a just-issued `enable` may not show yet.
    pub async fn status(&self) -> Result<PartitionStatus> {
        self.admin.partition_status().await
    }

    /// Ensure the benchmark's secondary indexes. Failures are logged and an
    /// empty list is returned; the indexes only speed up the measured queries.
    pub async fn ensure_query_indexes(&self) -> Vec<String> {
        match self.admin.ensure_query_indexes().await {
            Ok(indexes) => indexes,
            Err(e) => {
                warn!(error = %e, "Could not ensure query indexes");
                Vec::new()
            }
        }
    }
}
