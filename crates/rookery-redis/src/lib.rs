//! Redis backend for rookery
//!
//! Records are stored one hash per key (`penguin:<sampleNumber>`) with every
//! field value JSON-encoded. Redis keeps no index on the partition field.

pub mod adapter;

pub use adapter::{decode_hash, filter_by_partition, KeyValueStoreAdapter, RedisConfig};
pub use rookery_common::{Result, RookeryError};
