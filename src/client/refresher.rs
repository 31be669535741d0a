use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::Result;
use crate::ServerDetail;
use crate::SystemError;

/// Resolves the current location of a logical server after its last known
/// address stopped answering.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServerConnectionRefresher: Send + Sync {
    async fn refresh_connection(
        &self,
        server: &ServerDetail,
    ) -> Result<ServerDetail>;
}

/// Source of truth for where shuffle servers currently run, usually backed by
/// a coordination service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn lookup_server(
        &self,
        server_id: &str,
    ) -> Result<Option<ServerDetail>>;
}

/// Registry kept in process memory, updated by whoever learns about server
/// moves (heartbeats, job driver broadcasts).
#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    servers: DashMap<String, ServerDetail>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest detail of a server, replacing any previous one.
    pub fn register_server(
        &self,
        server: ServerDetail,
    ) {
        debug!("Registering {}", server);
        self.servers.insert(server.server_id().to_string(), server);
    }

    pub fn unregister_server(
        &self,
        server_id: &str,
    ) -> Option<ServerDetail> {
        self.servers.remove(server_id).map(|(_, server)| server)
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    async fn lookup_server(
        &self,
        server_id: &str,
    ) -> Result<Option<ServerDetail>> {
        Ok(self.servers.get(server_id).map(|entry| entry.value().clone()))
    }
}

/// Refreshes a server by looking its id up in a [`ServiceRegistry`].
#[derive(Clone)]
pub struct RegistryServerConnectionRefresher {
    registry: Arc<dyn ServiceRegistry>,
}

impl RegistryServerConnectionRefresher {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ServerConnectionRefresher for RegistryServerConnectionRefresher {
    async fn refresh_connection(
        &self,
        server: &ServerDetail,
    ) -> Result<ServerDetail> {
        match self.registry.lookup_server(server.server_id()).await? {
            Some(refreshed) => {
                debug!("Refreshed {} to {}", server, refreshed);
                Ok(refreshed)
            }
            None => Err(SystemError::ServerNotFound(server.server_id().to_string()).into()),
        }
    }
}
