//! Common types for rookery
//!
//! This crate provides the pieces shared by every storage backend and by the
//! benchmark core: the error taxonomy, the `Record` payload, and the capability
//! traits each backend implements.

pub mod adapter;
pub mod error;
pub mod partition;
pub mod record;

pub use adapter::{not_connected, Backend, StoreAdapter};
pub use error::{Result, RookeryError};
pub use partition::{PartitionAdmin, PartitionOutcome, PartitionStatus};
pub use record::{Record, KEY_FIELD, PARTITION_FIELD};
