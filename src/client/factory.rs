use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use super::PooledWriteClientFactory;
use super::RecordSocketWriteClient;
use super::SingleServerWriteClient;
use super::WriteSessionParams;
use crate::PoolConfig;
use crate::Result;
use crate::ServerHostAndPort;

/// Strategy for obtaining a client bound to one physical server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WriteClientFactory: Send + Sync {
    /// Returns a client for `target` that is not shared with any other
    /// caller until it is closed.
    async fn get_or_create_client(
        &self,
        target: &ServerHostAndPort,
        params: &WriteSessionParams,
    ) -> Result<Box<dyn SingleServerWriteClient>>;
}

/// Creates a fresh physical connection for every call.
///
/// The caller owns the returned client exclusively and must close it.
#[derive(Debug, Clone, Default)]
pub struct UnpooledWriteClientFactory;

impl UnpooledWriteClientFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WriteClientFactory for UnpooledWriteClientFactory {
    async fn get_or_create_client(
        &self,
        target: &ServerHostAndPort,
        params: &WriteSessionParams,
    ) -> Result<Box<dyn SingleServerWriteClient>> {
        let client = RecordSocketWriteClient::new(target.clone(), params.clone());
        debug!(connection_id = client.connection_id(), %target, "Created unpooled write client");
        Ok(Box::new(client))
    }
}

/// Both acquisition strategies, constructed once by the application root and
/// shared with every [`crate::ServerIdAwareWriteClient`] it creates.
#[derive(Clone)]
pub struct WriteClientFactories {
    pooled: Arc<dyn WriteClientFactory>,
    unpooled: Arc<dyn WriteClientFactory>,
}

impl WriteClientFactories {
    pub fn new(pool_config: PoolConfig) -> Self {
        Self {
            pooled: Arc::new(PooledWriteClientFactory::new(pool_config)),
            unpooled: Arc::new(UnpooledWriteClientFactory::new()),
        }
    }

    /// Assembles a registry from explicit factories, e.g. fakes in tests.
    pub fn with_factories(
        pooled: Arc<dyn WriteClientFactory>,
        unpooled: Arc<dyn WriteClientFactory>,
    ) -> Self {
        Self { pooled, unpooled }
    }

    pub fn select(
        &self,
        use_pooled_connection: bool,
    ) -> &Arc<dyn WriteClientFactory> {
        if use_pooled_connection {
            &self.pooled
        } else {
            &self.unpooled
        }
    }
}
