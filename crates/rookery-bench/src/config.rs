//! Settings for connections and benchmark runs
//!
//! Read from an optional TOML file, then overridden by the environment
//! variables the deployment already sets (`MONGO_URL`, `CASSANDRA_HOST`, ...).

use rookery_cassandra::CassandraConfig;
use rookery_common::{Result, RookeryError};
use rookery_mongodb::{MongoConfig, PoolConfig};
use rookery_redis::RedisConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::workload::{Workload, DEFAULT_PARTITION_VALUES};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mongodb: MongoSettings,
    pub cassandra: CassandraSettings,
    pub redis: RedisSettings,
    pub benchmark: BenchmarkSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    /// Connection string; must name the default database
    pub url: String,
    pub collection: String,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub connect_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017/penguins".to_string(),
            collection: "penguins".to_string(),
            min_pool_size: 1,
            max_pool_size: 10,
            connect_timeout_ms: 10_000,
            server_selection_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CassandraSettings {
    pub host: String,
    pub port: u16,
    pub keyspace: String,
    pub table: String,
    pub connect_timeout_ms: u64,
}

impl Default for CassandraSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9042,
            keyspace: "penguins".to_string(),
            table: "penguins".to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub key_pattern: String,
    pub pool_size: usize,
    pub connect_timeout_ms: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            key_pattern: "penguin:*".to_string(),
            pool_size: 10,
            connect_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    /// Number of fetch-all calls per run (N)
    pub fetch_all_queries: usize,
    /// Number of calls per partition value (M)
    pub queries_per_partition: usize,
    pub partition_values: Vec<String>,
    /// Field the document store is sharded on
    pub shard_key: String,
    /// Fixed pause between enabling sharding and re-measuring
    pub settle_interval_ms: u64,
    /// Upper bound for each backend's liveness probe
    pub health_timeout_ms: u64,
    /// Optional overall deadline for one run
    pub run_deadline_ms: Option<u64>,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            fetch_all_queries: 10,
            queries_per_partition: 5,
            partition_values: DEFAULT_PARTITION_VALUES.iter().map(|v| v.to_string()).collect(),
            shard_key: "species".to_string(),
            settle_interval_ms: 1_000,
            health_timeout_ms: 2_000,
            run_deadline_ms: None,
        }
    }
}

impl BenchmarkSettings {
    pub fn workload(&self) -> Workload {
        let workload = Workload::new(
            self.fetch_all_queries,
            self.queries_per_partition,
            self.partition_values.clone(),
        );
        match self.run_deadline_ms {
            Some(ms) => workload.with_deadline(Duration::from_millis(ms)),
            None => workload,
        }
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

impl Settings {
    /// Load settings from `path` (if given) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    RookeryError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        settings.apply_env_from(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RookeryError::Config(format!("Invalid settings: {}", e)))
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MONGO_URL") {
            self.mongodb.url = url;
        }
        if let Some(host) = lookup("CASSANDRA_HOST") {
            self.cassandra.host = host;
        }
        if let Some(port) = lookup("CASSANDRA_PORT") {
            self.cassandra.port = parse_port("CASSANDRA_PORT", &port)?;
        }
        if let Some(keyspace) = lookup("CASSANDRA_KEYSPACE") {
            self.cassandra.keyspace = keyspace;
        }
        if let Some(host) = lookup("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Some(port) = lookup("REDIS_PORT") {
            self.redis.port = parse_port("REDIS_PORT", &port)?;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.redis.password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let bench = &self.benchmark;
        if bench.shard_key.is_empty() {
            return Err(RookeryError::Config("benchmark.shard_key must not be empty".to_string()));
        }
        if bench.partition_values.iter().any(String::is_empty) {
            return Err(RookeryError::Config(
                "benchmark.partition_values must not contain empty values".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mongo_config(&self) -> MongoConfig {
        let m = &self.mongodb;
        MongoConfig {
            url: m.url.clone(),
            collection: m.collection.clone(),
            pool: PoolConfig {
                min_pool_size: Some(m.min_pool_size),
                max_pool_size: Some(m.max_pool_size),
                connect_timeout: Some(Duration::from_millis(m.connect_timeout_ms)),
                server_selection_timeout: Some(Duration::from_millis(m.server_selection_timeout_ms)),
                app_name: Some("rookery".to_string()),
            },
        }
    }

    pub fn cassandra_config(&self) -> CassandraConfig {
        let c = &self.cassandra;
        CassandraConfig {
            host: c.host.clone(),
            port: c.port,
            keyspace: c.keyspace.clone(),
            table: c.table.clone(),
            connect_timeout: Duration::from_millis(c.connect_timeout_ms),
        }
    }

    pub fn redis_config(&self) -> RedisConfig {
        let r = &self.redis;
        RedisConfig {
            host: r.host.clone(),
            port: r.port,
            password: r.password.clone(),
            key_pattern: r.key_pattern.clone(),
            pool_size: r.pool_size,
            connect_timeout: Duration::from_millis(r.connect_timeout_ms),
        }
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| RookeryError::Config(format!("{} is not a valid port: {}", name, value)))
}
