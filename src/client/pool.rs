use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ConnectUploadResponse;
use super::RecordSocketWriteClient;
use super::SingleServerWriteClient;
use super::WriteClientFactory;
use super::WriteSessionParams;
use crate::AppTaskAttemptId;
use crate::Error;
use crate::PoolConfig;
use crate::Result;
use crate::ServerHostAndPort;
use crate::POOL_EVICTIONS;
use crate::POOL_LEASES;

/// Connections are only shared between sessions whose key matches exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PoolKey {
    target: ServerHostAndPort,
    params: WriteSessionParams,
}

/// Idle physical connections, grouped by key.
///
/// A connection is either stored here or leased to exactly one
/// [`PooledWriteClient`]; checkout removes it from the map under the shard
/// lock, so two acquirers can never obtain the same connection.
#[derive(Debug)]
pub(crate) struct ConnectionRegistry {
    idle: DashMap<PoolKey, Vec<RecordSocketWriteClient>>,
    config: PoolConfig,
}

impl ConnectionRegistry {
    fn new(config: PoolConfig) -> Self {
        Self {
            idle: DashMap::new(),
            config,
        }
    }

    fn is_expired(
        &self,
        conn: &RecordSocketWriteClient,
    ) -> bool {
        conn.last_used().elapsed() > Duration::from_millis(self.config.idle_timeout_ms)
    }

    fn is_usable(
        &self,
        conn: &RecordSocketWriteClient,
    ) -> bool {
        !self.is_expired(conn) && conn.is_reusable() && !conn.peer_closed()
    }

    /// Takes the most recently returned usable connection for `key`.
    ///
    /// Stale, broken or peer-closed entries met on the way are removed and
    /// handed back in the second slot so the caller can close them outside
    /// the lock. A key left without connections is dropped from the map.
    fn checkout(
        &self,
        key: &PoolKey,
    ) -> (Option<RecordSocketWriteClient>, Vec<RecordSocketWriteClient>) {
        let mut evicted = Vec::new();
        let leased = match self.idle.get_mut(key) {
            Some(mut entry) => loop {
                match entry.pop() {
                    Some(conn) if !self.is_usable(&conn) => evicted.push(conn),
                    other => break other,
                }
            },
            None => None,
        };
        self.idle.remove_if(key, |_, conns| conns.is_empty());
        (leased, evicted)
    }

    /// Removes expired connections under every key, and the keys they leave
    /// empty.
    fn sweep_expired(&self) -> Vec<RecordSocketWriteClient> {
        let mut evicted = Vec::new();
        self.idle.retain(|_, conns| {
            let (kept, expired): (Vec<_>, Vec<_>) = std::mem::take(conns)
                .into_iter()
                .partition(|conn| !self.is_expired(conn));
            *conns = kept;
            evicted.extend(expired);
            !conns.is_empty()
        });
        evicted
    }

    /// Stores `conn` for reuse, or gives it back when the key is at capacity.
    fn checkin(
        &self,
        key: PoolKey,
        conn: RecordSocketWriteClient,
    ) -> Option<RecordSocketWriteClient> {
        let mut entry = self.idle.entry(key).or_default();
        if entry.len() >= self.config.max_idle_per_key {
            return Some(conn);
        }
        entry.push(conn);
        None
    }

    fn idle_count(
        &self,
        key: &PoolKey,
    ) -> usize {
        self.idle.get(key).map(|entry| entry.len()).unwrap_or(0)
    }

    fn total_idle(&self) -> usize {
        self.idle.iter().map(|entry| entry.value().len()).sum()
    }

    fn key_count(&self) -> usize {
        self.idle.len()
    }
}

async fn close_evicted(evicted: Vec<RecordSocketWriteClient>) {
    for mut conn in evicted {
        POOL_EVICTIONS.inc();
        debug!(connection_id = conn.connection_id(), target = %conn.target(), "Evicting pooled connection");
        if let Err(e) = conn.close().await {
            warn!("Failed to close evicted connection {}: {}", conn.connection_id(), e);
        }
    }
}

/// Leases physical connections from a registry shared by every session of
/// the process, amortizing connection setup across short uploads.
#[derive(Debug, Clone)]
pub struct PooledWriteClientFactory {
    registry: Arc<ConnectionRegistry>,
}

impl PooledWriteClientFactory {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(config)),
        }
    }

    /// Number of idle connections kept for one key.
    pub fn idle_connections(
        &self,
        target: &ServerHostAndPort,
        params: &WriteSessionParams,
    ) -> usize {
        self.registry.idle_count(&PoolKey {
            target: target.clone(),
            params: params.clone(),
        })
    }

    pub fn total_idle_connections(&self) -> usize {
        self.registry.total_idle()
    }

    /// Number of keys that currently hold idle connections.
    pub fn idle_keys(&self) -> usize {
        self.registry.key_count()
    }

    /// Closes idle connections past the idle timeout under every key.
    ///
    /// Runs on every lease; call it directly to reclaim sockets when no new
    /// sessions are started.
    pub async fn evict_expired(&self) {
        close_evicted(self.registry.sweep_expired()).await;
    }

    /// Leases a connection without boxing; the trait impl wraps this.
    pub async fn lease(
        &self,
        target: &ServerHostAndPort,
        params: &WriteSessionParams,
    ) -> PooledWriteClient {
        let key = PoolKey {
            target: target.clone(),
            params: params.clone(),
        };
        self.evict_expired().await;
        let (leased, evicted) = self.registry.checkout(&key);
        close_evicted(evicted).await;

        let conn = match leased {
            Some(mut conn) => {
                POOL_LEASES.with_label_values(&["reused"]).inc();
                trace!(connection_id = conn.connection_id(), %target, "Reusing pooled connection");
                conn.reset_session();
                conn.expire_handshake();
                conn
            }
            None => {
                POOL_LEASES.with_label_values(&["created"]).inc();
                let conn = RecordSocketWriteClient::new(target.clone(), params.clone());
                debug!(connection_id = conn.connection_id(), %target, "Created pooled connection");
                conn
            }
        };

        PooledWriteClient {
            key,
            conn: Some(conn),
            registry: self.registry.clone(),
        }
    }
}

#[async_trait]
impl WriteClientFactory for PooledWriteClientFactory {
    async fn get_or_create_client(
        &self,
        target: &ServerHostAndPort,
        params: &WriteSessionParams,
    ) -> Result<Box<dyn SingleServerWriteClient>> {
        Ok(Box::new(self.lease(target, params).await))
    }
}

/// Exclusive lease on a pooled connection.
///
/// Closing the lease returns the connection to the registry when it can
/// carry another session, and shuts it down otherwise.
#[derive(Debug)]
pub struct PooledWriteClient {
    key: PoolKey,
    conn: Option<RecordSocketWriteClient>,
    registry: Arc<ConnectionRegistry>,
}

impl PooledWriteClient {
    /// Id of the leased physical connection, `None` once the lease is closed.
    pub fn connection_id(&self) -> Option<u64> {
        self.conn.as_ref().map(|conn| conn.connection_id())
    }

    fn conn_mut(&mut self) -> Result<&mut RecordSocketWriteClient> {
        let target = &self.key.target;
        self.conn
            .as_mut()
            .ok_or_else(|| Error::NotConnected(format!("pooled lease on {target} already closed")))
    }
}

#[async_trait]
impl SingleServerWriteClient for PooledWriteClient {
    async fn connect(&mut self) -> Result<ConnectUploadResponse> {
        self.conn_mut()?.connect().await
    }

    async fn start_upload(
        &mut self,
        app_task_attempt_id: &AppTaskAttemptId,
        num_maps: u32,
        num_partitions: u32,
    ) -> Result<()> {
        self.conn_mut()?
            .start_upload(app_task_attempt_id, num_maps, num_partitions)
            .await
    }

    async fn send_record(
        &mut self,
        partition: u32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
    ) -> Result<()> {
        self.conn_mut()?.send_record(partition, key, value).await
    }

    async fn finish_upload(&mut self) -> Result<()> {
        self.conn_mut()?.finish_upload().await
    }

    fn get_shuffle_write_bytes(&self) -> u64 {
        self.conn.as_ref().map_or(0, |conn| conn.get_shuffle_write_bytes())
    }

    fn invalidate(&mut self) {
        if let Some(conn) = self.conn.as_mut() {
            conn.invalidate();
        }
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        if conn.is_reusable() {
            conn.reset_session();
            let connection_id = conn.connection_id();
            match self.registry.checkin(self.key.clone(), conn) {
                None => {
                    trace!(connection_id, "Returned connection to pool");
                    return Ok(());
                }
                Some(rejected) => conn = rejected,
            }
        }

        POOL_EVICTIONS.inc();
        conn.close().await
    }
}
