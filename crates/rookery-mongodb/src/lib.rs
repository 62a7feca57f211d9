//! MongoDB backend for rookery
//!
//! This crate provides the document-store side of the benchmark.
//!
//! # Features
//! - Pooled connection with health checking
//! - `StoreAdapter` reads with the `_id` metadata projected away
//! - Sharding administration (`enableSharding`, `shardCollection`, status)
//! - Idempotent index management for the benchmark queries

pub mod adapter;
pub mod connection;
pub mod convert;
pub mod sharding;

pub use adapter::{DocumentStoreAdapter, MongoConfig};
pub use connection::{Connection, PoolConfig};
pub use rookery_common::{Result, RookeryError};
