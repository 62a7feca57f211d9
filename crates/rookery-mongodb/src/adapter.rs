//! Document store adapter

use async_trait::async_trait;
use bson::{doc, Document as BsonDocument};
use futures::TryStreamExt;
use mongodb::IndexModel;
use parking_lot::RwLock;
use rookery_common::{
    not_connected, Backend, PartitionAdmin, PartitionOutcome, PartitionStatus, Record, Result,
    RookeryError, StoreAdapter, PARTITION_FIELD,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::connection::{Connection, PoolConfig};
use crate::convert::document_to_record;
use crate::sharding;

/// Where the dataset lives in MongoDB
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string including the default database
    pub url: String,
    pub collection: String,
    pub pool: PoolConfig,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017/penguins".to_string(),
            collection: "penguins".to_string(),
            pool: PoolConfig::default(),
        }
    }
}

/// Reads records from a MongoDB collection and administers its sharding.
///
/// The live `Connection` sits behind a read-write lock only so that connect and
/// disconnect can swap it; queries clone the `Arc` out and release the lock
/// before awaiting, relying on the driver's pool for concurrent use.
pub struct DocumentStoreAdapter {
    config: MongoConfig,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl DocumentStoreAdapter {
    /// Create a disconnected adapter
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    fn live(&self) -> Result<Arc<Connection>> {
        self.connection
            .read()
            .clone()
            .ok_or_else(|| not_connected(Backend::MongoDb))
    }

    async fn find(&self, filter: BsonDocument) -> Result<Vec<Record>> {
        let conn = self.live()?;
        let cursor = conn
            .collection(&self.config.collection)
            .find(filter)
            .projection(doc! { "_id": 0 })
            .await?;
        let documents: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(document_to_record).collect())
    }

    /// Returns the name the server gave the index, e.g. `species_1`
    async fn create_index(&self, conn: &Connection, keys: BsonDocument) -> Result<String> {
        let model = IndexModel::builder().keys(keys).build();
        let created = conn
            .collection(&self.config.collection)
            .create_index(model)
            .await?;
        Ok(created.index_name)
    }

    /// The collection's `config.collections` entry, present only when sharded
    async fn sharded_entry(&self, conn: &Connection) -> Result<Option<BsonDocument>> {
        let ns = sharding::namespace(conn.database_name(), &self.config.collection);
        let entry = conn
            .config_db()
            .collection::<BsonDocument>("collections")
            .find_one(sharding::sharded_entry_filter(&ns))
            .await?;
        Ok(entry)
    }

    /// The shard key recorded for the collection, if it is sharded
    async fn existing_shard_key(&self, conn: &Connection) -> Result<Option<Vec<String>>> {
        let entry = self.sharded_entry(conn).await?;
        Ok(entry.as_ref().map(sharding::shard_key_fields))
    }
}

#[async_trait]
impl StoreAdapter for DocumentStoreAdapter {
    fn backend(&self) -> Backend {
        Backend::MongoDb
    }

    async fn connect(&self) -> Result<()> {
        let conn = Connection::with_config(&self.config.url, self.config.pool.clone()).await?;
        conn.ping().await?;

        info!(
            backend = %Backend::MongoDb,
            database = conn.database_name(),
            collection = %self.config.collection,
            "Connected to MongoDB"
        );

        let previous = self.connection.write().replace(Arc::new(conn));
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let taken = self.connection.write().take();
        if let Some(conn) = taken {
            conn.shutdown().await;
            info!(backend = %Backend::MongoDb, "Disconnected from MongoDB");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    async fn ping(&self) -> Result<()> {
        self.live()?.ping().await
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.find(doc! {}).await
    }

    async fn fetch_by_partition_key(&self, key: &str) -> Result<Vec<Record>> {
        let mut filter = BsonDocument::new();
        filter.insert(PARTITION_FIELD, key);
        self.find(filter).await
    }
}

#[async_trait]
impl PartitionAdmin for DocumentStoreAdapter {
    async fn ensure_index(&self, field: &str) -> Result<()> {
        let conn = self.live()?;
        self.create_index(&conn, sharding::ascending_key(field)).await?;
        debug!(backend = %Backend::MongoDb, field, "Index ensured");
        Ok(())
    }

    async fn ensure_query_indexes(&self) -> Result<Vec<String>> {
        let conn = self.live()?;
        let mut created = Vec::new();
        for keys in sharding::query_index_keys() {
            created.push(self.create_index(&conn, keys).await?);
        }
        info!(backend = %Backend::MongoDb, indexes = ?created, "Query indexes ensured");
        Ok(created)
    }

    async fn enable_partitioning(&self, key: &str) -> Result<PartitionOutcome> {
        let conn = self.live()?;
        let admin = conn.admin();
        let ns = sharding::namespace(conn.database_name(), &self.config.collection);

        // Newer servers accept shardCollection on an already sharded collection
        // silently, so the metadata is consulted before anything is issued.
        let existing = self
            .existing_shard_key(&conn)
            .await
            .map_err(|e| RookeryError::PartitioningFailed(e.to_string()))?;
        if let Some(fields) = existing {
            return Ok(PartitionOutcome::AlreadyPartitioned {
                key: fields.join(","),
            });
        }

        // enableSharding is not undone if shardCollection is rejected below.
        // From 6.0 every database is shard-enabled anyway and the command is a
        // no-op; on older servers it only marks the database, leaving every
        // collection unsharded.
        if let Err(e) = admin
            .run_command(sharding::enable_sharding_command(conn.database_name()))
            .await
        {
            if !sharding::is_already_partitioned(&e) {
                return Err(RookeryError::PartitioningFailed(e.to_string()));
            }
            debug!(database = conn.database_name(), "Sharding already enabled on database");
        }

        match admin
            .run_command(sharding::shard_collection_command(&ns, key))
            .await
        {
            Ok(_) => {
                info!(namespace = %ns, key, "Collection sharded");
                Ok(PartitionOutcome::Enabled {
                    key: key.to_string(),
                })
            }
            Err(e) if sharding::is_already_partitioned(&e) => {
                warn!(namespace = %ns, error = %e, "Collection already sharded");
                let fields = self.existing_shard_key(&conn).await.ok().flatten();
                Ok(PartitionOutcome::AlreadyPartitioned {
                    key: fields
                        .map(|f| f.join(","))
                        .unwrap_or_else(|| key.to_string()),
                })
            }
            Err(e) => Err(RookeryError::PartitioningFailed(e.to_string())),
        }
    }

    async fn partition_status(&self) -> Result<PartitionStatus> {
        let conn = self.live()?;
        let stats = conn
            .database()
            .run_command(doc! { "collStats": self.config.collection.as_str() })
            .await?;

        let entry = self.sharded_entry(&conn).await?;

        Ok(sharding::build_status(entry.as_ref(), &stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_adapter_is_unavailable() {
        let adapter = DocumentStoreAdapter::new(MongoConfig::default());
        assert!(!adapter.is_connected());

        let err = adapter.fetch_all().await.unwrap_err();
        assert!(matches!(err, RookeryError::BackendUnavailable(_)));

        let err = adapter.fetch_by_partition_key("Gentoo").await.unwrap_err();
        assert!(matches!(err, RookeryError::BackendUnavailable(_)));

        let err = adapter.enable_partitioning("species").await.unwrap_err();
        assert!(matches!(err, RookeryError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let adapter = DocumentStoreAdapter::new(MongoConfig::default());
        adapter.disconnect().await;
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    #[ignore]
    async fn test_query_indexes_live() {
        let adapter = DocumentStoreAdapter::new(MongoConfig::default());
        adapter.connect().await.unwrap();

        let names = adapter.ensure_query_indexes().await.unwrap();
        assert_eq!(names, vec!["species_1", "island_1", "species_1_island_1"]);

        adapter.disconnect().await;
    }

    /// Needs a mongos with at least one shard
    #[tokio::test]
    #[ignore]
    async fn test_enable_partitioning_twice_live() {
        let adapter = DocumentStoreAdapter::new(MongoConfig::default());
        adapter.connect().await.unwrap();

        adapter.enable_partitioning("species").await.unwrap();
        let again = adapter.enable_partitioning("island").await.unwrap();
        assert_eq!(
            again,
            PartitionOutcome::AlreadyPartitioned {
                key: "species".to_string()
            }
        );

        adapter.disconnect().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_by_partition_key_live() {
        let adapter = DocumentStoreAdapter::new(MongoConfig::default());
        adapter.connect().await.unwrap();

        let gentoo = adapter.fetch_by_partition_key("Gentoo").await.unwrap();
        assert!(gentoo
            .iter()
            .all(|r| r.partition_value(PARTITION_FIELD) == Some("Gentoo")));

        let none = adapter.fetch_by_partition_key("").await.unwrap();
        assert!(none.is_empty());

        adapter.disconnect().await;
    }
}
