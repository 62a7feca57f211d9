//! Key-value store adapter

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use parking_lot::RwLock;
use rookery_common::{
    not_connected, Backend, Record, Result, RookeryError, StoreAdapter, PARTITION_FIELD,
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Where the dataset lives in Redis
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// SCAN pattern matching every record hash
    pub key_pattern: String,
    /// Connection pool size
    pub pool_size: usize,
    /// Bounds both connection creation and waiting for a pooled connection
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            key_pattern: "penguin:*".to_string(),
            pool_size: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/", password, self.host, self.port),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }
}

/// Decode one stored hash; values that are not valid JSON are kept as strings
pub fn decode_hash(hash: HashMap<String, String>) -> Record {
    hash.into_iter()
        .map(|(field, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (field, value)
        })
        .collect()
}

/// Keep the records whose partition field equals `key`
pub fn filter_by_partition(records: Vec<Record>, key: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| record.partition_value(PARTITION_FIELD) == Some(key))
        .collect()
}

/// Collect every key matching `pattern`, one SCAN page at a time until the
/// cursor returns to zero. A failed page fails the whole sweep.
pub async fn scan_keys<C>(conn: &mut C, pattern: &str) -> Result<Vec<String>>
where
    C: redis::aio::ConnectionLike + Send,
{
    let mut keys = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
            .cursor_arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .query_async(conn)
            .await?;
        keys.extend(page);
        if next == 0 {
            return Ok(keys);
        }
        cursor = next;
    }
}

/// Reads records from Redis hashes.
///
/// deadpool's `Pool` is a cheap, clonable, concurrency-safe handle; the lock
/// only guards swapping it on connect and disconnect.
pub struct KeyValueStoreAdapter {
    config: RedisConfig,
    pool: RwLock<Option<Pool>>,
}

impl KeyValueStoreAdapter {
    /// Create a disconnected adapter
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn live(&self) -> Result<Pool> {
        self.pool
            .read()
            .clone()
            .ok_or_else(|| not_connected(Backend::Redis))
    }

    fn build_pool(&self) -> Result<Pool> {
        PoolConfig::from_url(self.config.url())
            .builder()
            .map_err(|e| RookeryError::Config(format!("Failed to create pool builder: {}", e)))?
            .max_size(self.config.pool_size)
            .wait_timeout(Some(self.config.connect_timeout))
            .create_timeout(Some(self.config.connect_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RookeryError::Connection(format!("Failed to create pool: {}", e)))
    }

    async fn ping_pool(pool: &Pool) -> Result<()> {
        let mut conn = pool.get().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(reply = %pong, "Redis ping");
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for KeyValueStoreAdapter {
    fn backend(&self) -> Backend {
        Backend::Redis
    }

    async fn connect(&self) -> Result<()> {
        let pool = self.build_pool()?;
        Self::ping_pool(&pool)
            .await
            .map_err(|e| RookeryError::Connection(e.to_string()))?;

        info!(
            backend = %Backend::Redis,
            host = %self.config.host,
            port = self.config.port,
            "Connected to Redis"
        );

        *self.pool.write() = Some(pool);
        Ok(())
    }

    async fn disconnect(&self) {
        let taken = self.pool.write().take();
        if let Some(pool) = taken {
            pool.close();
            info!(backend = %Backend::Redis, "Disconnected from Redis");
        }
    }

    fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    async fn ping(&self) -> Result<()> {
        let pool = self.live()?;
        Self::ping_pool(&pool).await
    }

    /// A full SCAN sweep for the keys, then a single pipelined round of HGETALLs
    async fn fetch_all(&self) -> Result<Vec<Record>> {
        let pool = self.live()?;
        let mut conn = pool.get().await?;

        let keys = scan_keys(&mut conn, &self.config.key_pattern).await?;
        debug!(backend = %Backend::Redis, keys = keys.len(), "Scanned record keys");
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.hgetall(key);
        }
        let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        // A key deleted between SCAN and HGETALL comes back as an empty hash.
        Ok(hashes
            .into_iter()
            .filter(|hash| !hash.is_empty())
            .map(decode_hash)
            .collect())
    }

    /// Redis has no secondary index on the partition field, so this fetches
    /// everything and filters client-side. The extra cost is intentional: it is
    /// exactly what the cross-engine benchmark is meant to surface.
    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>> {
        let all = self.fetch_all().await?;
        Ok(filter_by_partition(all, key))
    }
}
