//! Sharding command construction and response interpretation
//!
//! Kept free of I/O so the classification rules can be tested without a
//! cluster. The adapter issues the commands built here.

use bson::{doc, Bson, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind};
use rookery_common::PartitionStatus;

use crate::convert::numeric_field;

/// Server error code `AlreadyInitialized`, returned when sharding a collection
/// (or enabling sharding on a database) that already is
pub const ALREADY_INITIALIZED_CODE: i32 = 23;

const ALREADY_INITIALIZED_NAME: &str = "AlreadyInitialized";

/// Structured code and code name of a command failure, if the error is one
pub fn command_error_code(err: &MongoError) -> Option<(i32, String)> {
    match err.kind.as_ref() {
        ErrorKind::Command(command_error) => {
            Some((command_error.code, command_error.code_name.clone()))
        }
        _ => None,
    }
}

/// Whether a server code reports an already-sharded target
pub fn is_already_partitioned_code(code: i32, code_name: &str) -> bool {
    code == ALREADY_INITIALIZED_CODE || code_name == ALREADY_INITIALIZED_NAME
}

pub fn is_already_partitioned(err: &MongoError) -> bool {
    command_error_code(err)
        .map(|(code, name)| is_already_partitioned_code(code, &name))
        .unwrap_or(false)
}

/// `<database>.<collection>`
pub fn namespace(database: &str, collection: &str) -> String {
    format!("{}.{}", database, collection)
}

/// Single-field ascending key document
pub fn ascending_key(field: &str) -> BsonDocument {
    let mut keys = BsonDocument::new();
    keys.insert(field, 1_i32);
    keys
}

pub fn enable_sharding_command(database: &str) -> BsonDocument {
    doc! { "enableSharding": database }
}

pub fn shard_collection_command(namespace: &str, key: &str) -> BsonDocument {
    doc! { "shardCollection": namespace, "key": ascending_key(key) }
}

/// Key documents of the secondary indexes the benchmark queries use
pub fn query_index_keys() -> Vec<BsonDocument> {
    vec![
        doc! { "species": 1 },
        doc! { "island": 1 },
        doc! { "species": 1, "island": 1 },
    ]
}

/// Filter selecting a sharded collection's entry in `config.collections`.
///
/// Servers that track unsharded collections there mark them `unsplittable`.
pub fn sharded_entry_filter(namespace: &str) -> BsonDocument {
    doc! { "_id": namespace, "unsplittable": { "$ne": true } }
}

/// Field names of the shard key recorded in a `config.collections` entry
pub fn shard_key_fields(entry: &BsonDocument) -> Vec<String> {
    match entry.get("key") {
        Some(Bson::Document(key)) => key.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Combine a `config.collections` entry (if any) with `collStats` output
pub fn build_status(entry: Option<&BsonDocument>, stats: &BsonDocument) -> PartitionStatus {
    let shard_key = entry.map(shard_key_fields).unwrap_or_default();
    PartitionStatus {
        is_sharded: entry.is_some(),
        shard_key,
        count: numeric_field(stats, "count"),
        size: numeric_field(stats, "size"),
    }
}
