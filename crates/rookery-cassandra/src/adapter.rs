//! Wide-column store adapter

use async_trait::async_trait;
use parking_lot::RwLock;
use rookery_common::{not_connected, Backend, Record, Result, RookeryError, StoreAdapter};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::value::Row;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::convert::{canonical_field, row_to_record};

/// Where the dataset lives in Cassandra
#[derive(Debug, Clone)]
pub struct CassandraConfig {
    pub host: String,
    pub port: u16,
    pub keyspace: String,
    pub table: String,
    pub connect_timeout: Duration,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9042,
            keyspace: "penguins".to_string(),
            table: "penguins".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl CassandraConfig {
    pub fn node(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads records from a Cassandra table partitioned by species.
///
/// A scylla `Session` multiplexes concurrent requests over its own
/// connection pool; the adapter shares one behind an `Arc` and holds its lock
/// only long enough to clone that `Arc`.
pub struct ColumnStoreAdapter {
    config: CassandraConfig,
    session: RwLock<Option<Arc<Session>>>,
    select_all: String,
    select_by_species: String,
}

impl ColumnStoreAdapter {
    /// Create a disconnected adapter
    pub fn new(config: CassandraConfig) -> Self {
        let select_all = format!("SELECT * FROM {}", config.table);
        let select_by_species = format!("SELECT * FROM {} WHERE species = ?", config.table);
        Self {
            config,
            session: RwLock::new(None),
            select_all,
            select_by_species,
        }
    }

    pub fn config(&self) -> &CassandraConfig {
        &self.config
    }

    fn live(&self) -> Result<Arc<Session>> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| not_connected(Backend::Cassandra))
    }
}

/// Materialise every row of a result into records
fn into_records(result: QueryResult) -> Result<Vec<Record>> {
    let rows = result
        .into_rows_result()
        .map_err(|e| RookeryError::QueryFailed(format!("Cassandra: {}", e)))?;

    let fields: Vec<String> = rows
        .column_specs()
        .iter()
        .map(|spec| canonical_field(spec.name()))
        .collect();

    let mut records = Vec::with_capacity(rows.rows_num());
    for row in rows
        .rows::<Row>()
        .map_err(|e| RookeryError::Serialization(format!("Cassandra rows: {}", e)))?
    {
        let row = row.map_err(|e| RookeryError::Serialization(format!("Cassandra row: {}", e)))?;
        records.push(row_to_record(&fields, row.columns));
    }
    Ok(records)
}

#[async_trait]
impl StoreAdapter for ColumnStoreAdapter {
    fn backend(&self) -> Backend {
        Backend::Cassandra
    }

    async fn connect(&self) -> Result<()> {
        let session = SessionBuilder::new()
            .known_node(self.config.node())
            .connection_timeout(self.config.connect_timeout)
            .use_keyspace(self.config.keyspace.clone(), false)
            .build()
            .await?;

        info!(
            backend = %Backend::Cassandra,
            node = %self.config.node(),
            keyspace = %self.config.keyspace,
            "Connected to Cassandra"
        );

        *self.session.write() = Some(Arc::new(session));
        Ok(())
    }

    async fn disconnect(&self) {
        let taken = self.session.write().take();
        if taken.is_some() {
            info!(backend = %Backend::Cassandra, "Disconnected from Cassandra");
        }
    }

    fn is_connected(&self) -> bool {
        self.session.read().is_some()
    }

    async fn ping(&self) -> Result<()> {
        let session = self.live()?;
        session
            .query_unpaged("SELECT release_version FROM system.local", ())
            .await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        let session = self.live()?;
        let result = session.query_unpaged(self.select_all.as_str(), ()).await?;
        into_records(result)
    }

    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>> {
        let session = self.live()?;
        // CQL rejects an empty partition key outright; no row can match it.
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let result = session
            .query_unpaged(self.select_by_species.as_str(), (key,))
            .await?;
        into_records(result)
    }
}
