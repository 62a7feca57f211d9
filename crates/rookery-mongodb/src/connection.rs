//! MongoDB connection management with pool configuration and health checking

use bson::{doc, Document as BsonDocument};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database,
};
use rookery_common::{Result, RookeryError};
use std::time::Duration;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool
    pub max_pool_size: Option<u32>,
    /// Connection timeout
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout; bounds how long a call waits for a reachable server
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: Some(1),
            max_pool_size: Some(10),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(5)),
            app_name: Some("rookery".to_string()),
        }
    }
}

/// MongoDB connection manager with pooling support.
///
/// The driver's `Client` is an internally pooled, thread-safe handle, so one
/// `Connection` serves concurrent callers without extra locking.
pub struct Connection {
    client: Client,
    database: Database,
    database_name: String,
}

impl Connection {
    /// Create a new MongoDB connection with custom pool configuration.
    ///
    /// The connection string must name a default database.
    pub async fn with_config(connection_string: &str, config: PoolConfig) -> Result<Self> {
        let mut client_options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| RookeryError::Connection(format!("Invalid MongoDB URL: {}", e)))?;

        if let Some(min) = config.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = config.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(connect) = config.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = config.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = config.app_name {
            client_options.app_name = Some(app);
        }

        // Non-strict stable API: admin commands outside V1 stay callable
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);

        let client = Client::with_options(client_options)
            .map_err(|e| RookeryError::Connection(e.to_string()))?;

        let database = client.default_database().ok_or_else(|| {
            RookeryError::Config("No default database specified in connection string".to_string())
        })?;

        let database_name = database.name().to_string();

        Ok(Self {
            client,
            database,
            database_name,
        })
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Get a reference to the client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The `admin` database, target of cluster commands
    pub fn admin(&self) -> Database {
        self.client.database("admin")
    }

    /// The `config` database holding sharding metadata
    pub fn config_db(&self) -> Database {
        self.client.database("config")
    }

    /// Get a collection by name (untyped)
    pub fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Check the connection by pinging the server
    pub async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| RookeryError::Connection(format!("Ping failed: {}", e)))
    }

    /// Close the pool, waiting for in-flight operations to finish
    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}
