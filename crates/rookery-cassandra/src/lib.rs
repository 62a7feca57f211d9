//! Cassandra backend for rookery
//!
//! Wide-column reads over CQL. The table is partitioned by species, so a
//! partition-key query is a native single-partition read.

pub mod adapter;
pub mod convert;

pub use adapter::{CassandraConfig, ColumnStoreAdapter};
pub use rookery_common::{Result, RookeryError};
