//! In-memory stores shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rookery_bench::{ConnectionRegistry, Settings};
use rookery_common::{
    not_connected, Backend, PartitionAdmin, PartitionOutcome, PartitionStatus, Record, Result,
    RookeryError, StoreAdapter, KEY_FIELD, PARTITION_FIELD,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SPECIES: [&str; 3] = ["Adelie", "Chinstrap", "Gentoo"];

/// Ten records split 4/3/3 across the three species
pub fn dataset() -> Vec<Record> {
    let split = [(SPECIES[0], 4), (SPECIES[1], 3), (SPECIES[2], 3)];
    let mut records = Vec::new();
    let mut sample = 1;
    for (species, count) in split {
        for _ in 0..count {
            let mut record = Record::new();
            record.insert(KEY_FIELD, json!(sample));
            record.insert(PARTITION_FIELD, json!(species));
            record.insert("island", json!("Dream"));
            records.push(record);
            sample += 1;
        }
    }
    records
}

/// A store that answers from memory. It can be told to fail after a number
/// of successful calls, or to stall on ping.
pub struct MemoryStore {
    backend: Backend,
    records: Vec<Record>,
    connected: AtomicBool,
    refuse_connect: bool,
    fail_after: Option<usize>,
    slow_ping: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            records: dataset(),
            connected: AtomicBool::new(false),
            refuse_connect: false,
            fail_after: None,
            slow_ping: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn with_slow_ping(mut self, delay: Duration) -> Self {
        self.slow_ping = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(not_connected(self.backend));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(limit) if n >= limit => Err(RookeryError::QueryFailed(format!(
                "{} dropped the connection",
                self.backend
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn connect(&self) -> Result<()> {
        if self.refuse_connect {
            return Err(RookeryError::Connection("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> Result<()> {
        if let Some(delay) = self.slow_ping {
            tokio::time::sleep(delay).await;
        }
        if self.is_connected() {
            Ok(())
        } else {
            Err(not_connected(self.backend))
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.check()?;
        Ok(self.records.clone())
    }

    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>> {
        self.check()?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.partition_value(PARTITION_FIELD) == Some(key))
            .cloned()
            .collect())
    }
}

/// A document store that also accepts partitioning commands
pub struct MemoryDocumentStore {
    pub store: MemoryStore,
    sharded_on: parking_lot::Mutex<Option<String>>,
    reject_sharding: AtomicBool,
    pub enable_calls: AtomicUsize,
    pub index_calls: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            sharded_on: parking_lot::Mutex::new(None),
            reject_sharding: AtomicBool::new(false),
            enable_calls: AtomicUsize::new(0),
            index_calls: AtomicUsize::new(0),
        }
    }

    pub fn reject_sharding(&self, reject: bool) {
        self.reject_sharding.store(reject, Ordering::SeqCst);
    }

    pub fn sharded_on(&self) -> Option<String> {
        self.sharded_on.lock().clone()
    }
}

#[async_trait]
impl StoreAdapter for MemoryDocumentStore {
    fn backend(&self) -> Backend {
        self.store.backend()
    }

    async fn connect(&self) -> Result<()> {
        self.store.connect().await
    }

    async fn disconnect(&self) {
        self.store.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.store.fetch_all().await
    }

    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>> {
        self.store.fetch_by_partition_key(key).await
    }
}

#[async_trait]
impl PartitionAdmin for MemoryDocumentStore {
    async fn ensure_index(&self, _field: &str) -> Result<()> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_query_indexes(&self) -> Result<Vec<String>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["species_1".to_string(), "island_1".to_string()])
    }

    async fn enable_partitioning(&self, key: &str) -> Result<PartitionOutcome> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_sharding.load(Ordering::SeqCst) {
            return Err(RookeryError::PartitioningFailed(
                "no shards registered".to_string(),
            ));
        }
        let mut sharded_on = self.sharded_on.lock();
        match &*sharded_on {
            Some(existing) => Ok(PartitionOutcome::AlreadyPartitioned {
                key: existing.clone(),
            }),
            None => {
                *sharded_on = Some(key.to_string());
                Ok(PartitionOutcome::Enabled {
                    key: key.to_string(),
                })
            }
        }
    }

    async fn partition_status(&self) -> Result<PartitionStatus> {
        let sharded_on = self.sharded_on();
        Ok(PartitionStatus {
            is_sharded: sharded_on.is_some(),
            shard_key: sharded_on.into_iter().collect(),
            count: self.store.records.len() as u64,
            size: 1024,
        })
    }
}

/// Settings with a small workload and no settle pause
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.benchmark.fetch_all_queries = 2;
    settings.benchmark.queries_per_partition = 1;
    settings.benchmark.settle_interval_ms = 0;
    settings.benchmark.health_timeout_ms = 100;
    settings
}

pub struct Fixture {
    pub registry: Arc<ConnectionRegistry>,
    pub document: Arc<MemoryDocumentStore>,
    pub column: Arc<MemoryStore>,
    pub key_value: Arc<MemoryStore>,
}

/// A registry over three connected in-memory stores
pub fn fixture() -> Fixture {
    fixture_with(
        MemoryStore::new(Backend::MongoDb).connected(),
        MemoryStore::new(Backend::Cassandra).connected(),
        MemoryStore::new(Backend::Redis).connected(),
    )
}

pub fn fixture_with(document: MemoryStore, column: MemoryStore, key_value: MemoryStore) -> Fixture {
    let document = Arc::new(MemoryDocumentStore::new(document));
    let column = Arc::new(column);
    let key_value = Arc::new(key_value);
    let registry = Arc::new(ConnectionRegistry::from_adapters(
        document.clone(),
        column.clone(),
        key_value.clone(),
        Duration::from_millis(100),
    ));
    Fixture {
        registry,
        document,
        column,
        key_value,
    }
}
