//! Process-wide holder of the three store adapters
//!
//! Built once at startup, shared by reference (`Arc`) with every component,
//! and shut down once at exit. There is no global lookup.

use futures::future::join_all;
use rookery_cassandra::ColumnStoreAdapter;
use rookery_common::{Backend, PartitionAdmin, StoreAdapter};
use rookery_mongodb::DocumentStoreAdapter;
use rookery_redis::KeyValueStoreAdapter;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Settings;

/// Per-backend liveness at the time of a probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthProbe {
    results: BTreeMap<Backend, bool>,
}

impl HealthProbe {
    pub fn is_alive(&self, backend: Backend) -> bool {
        self.results.get(&backend).copied().unwrap_or(false)
    }

    /// True only if every backend answered
    pub fn all_alive(&self) -> bool {
        Backend::ALL.iter().all(|b| self.is_alive(*b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Backend, bool)> + '_ {
        self.results.iter().map(|(b, alive)| (*b, *alive))
    }
}

impl FromIterator<(Backend, bool)> for HealthProbe {
    fn from_iter<I: IntoIterator<Item = (Backend, bool)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

pub struct ConnectionRegistry {
    document: Arc<dyn StoreAdapter>,
    admin: Arc<dyn PartitionAdmin>,
    column: Arc<dyn StoreAdapter>,
    key_value: Arc<dyn StoreAdapter>,
    probe_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create the production adapters, all disconnected
    pub fn new(settings: &Settings) -> Self {
        Self::from_adapters(
            Arc::new(DocumentStoreAdapter::new(settings.mongo_config())),
            Arc::new(ColumnStoreAdapter::new(settings.cassandra_config())),
            Arc::new(KeyValueStoreAdapter::new(settings.redis_config())),
            settings.benchmark.health_timeout(),
        )
    }

    /// Assemble a registry from arbitrary adapters. The document adapter also
    /// provides partitioning administration.
    pub fn from_adapters<D>(
        document: Arc<D>,
        column: Arc<dyn StoreAdapter>,
        key_value: Arc<dyn StoreAdapter>,
        probe_timeout: Duration,
    ) -> Self
    where
        D: StoreAdapter + PartitionAdmin + 'static,
    {
        Self {
            document: document.clone(),
            admin: document,
            column,
            key_value,
            probe_timeout,
        }
    }

    pub fn adapter(&self, backend: Backend) -> Arc<dyn StoreAdapter> {
        match backend {
            Backend::MongoDb => self.document.clone(),
            Backend::Cassandra => self.column.clone(),
            Backend::Redis => self.key_value.clone(),
        }
    }

    pub fn partition_admin(&self) -> Arc<dyn PartitionAdmin> {
        self.admin.clone()
    }

    /// Connect every adapter in turn. A backend that fails to connect is logged
    /// and left disconnected; the others are still connected.
    pub async fn initialize(&self) -> BTreeMap<Backend, bool> {
        let mut connected = BTreeMap::new();
        for backend in Backend::ALL {
            let ok = match self.adapter(backend).connect().await {
                Ok(()) => true,
                Err(e) => {
                    error!(backend = %backend, error = %e, "Failed to connect");
                    false
                }
            };
            connected.insert(backend, ok);
        }

        let available = connected.values().filter(|ok| **ok).count();
        info!(available, total = Backend::ALL.len(), "Connection registry initialized");
        connected
    }

    pub async fn shutdown(&self) {
        for backend in Backend::ALL {
            self.adapter(backend).disconnect().await;
        }
        info!("Connection registry shut down");
    }

    /// Ping every backend concurrently. Each ping is bounded by the probe
    /// timeout, and any failure (including a timeout) reads as not alive.
    pub async fn health_probe(&self) -> HealthProbe {
        let probes = Backend::ALL.into_iter().map(|backend| {
            let adapter = self.adapter(backend);
            let timeout = self.probe_timeout;
            async move {
                let alive = match tokio::time::timeout(timeout, adapter.ping()).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        debug!(backend = %backend, error = %e, "Health probe failed");
                        false
                    }
                    Err(_) => {
                        debug!(backend = %backend, timeout_ms = timeout.as_millis() as u64, "Health probe timed out");
                        false
                    }
                };
                (backend, alive)
            }
        });
        join_all(probes).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_all_alive() {
        let probe: HealthProbe = Backend::ALL.iter().map(|b| (*b, true)).collect();
        assert!(probe.all_alive());

        let probe: HealthProbe = [(Backend::MongoDb, true), (Backend::Redis, true)]
            .into_iter()
            .collect();
        assert!(!probe.all_alive());
        assert!(!probe.is_alive(Backend::Cassandra));
    }

    #[tokio::test]
    async fn test_unconnected_registry_probes_dead() {
        let registry = ConnectionRegistry::new(&Settings::default());
        let probe = registry.health_probe().await;
        assert_eq!(probe.iter().count(), 3);
        assert!(probe.iter().all(|(_, alive)| !alive));
        assert_eq!(registry.adapter(Backend::Redis).backend(), Backend::Redis);
    }
}
