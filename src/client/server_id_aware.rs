use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ConnectUploadResponse;
use super::ServerConnectionRefresher;
use super::SingleServerWriteClient;
use super::WriteClientFactories;
use super::WriteSessionParams;
use crate::AppTaskAttemptId;
use crate::ConnectError;
use crate::Error;
use crate::ErrorKind;
use crate::Result;
use crate::ServerDetail;
use crate::CONNECT_FAILOVERS;
use crate::CONNECT_REJECTIONS;
use crate::SUPPRESSED_CLOSE_FAILURES;

/// Where the façade is in its connect lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Unconnected,
    Connecting,
    Connected,
    Failed,
}

/// Write client bound to a *logical* shuffle server.
///
/// `connect` checks that the server it reached reports the expected server id
/// and running version, and when the address turns out to be unreachable it
/// asks the refresher once for the server's new location. All upload calls
/// after a successful connect go straight to the underlying client.
///
/// One instance serves one upload session of one task; it is not meant to be
/// shared between tasks.
pub struct ServerIdAwareWriteClient {
    server_detail: ServerDetail,
    params: WriteSessionParams,
    use_pooled_connection: bool,
    factories: Arc<WriteClientFactories>,
    refresher: Option<Arc<dyn ServerConnectionRefresher>>,

    write_client: Option<Box<dyn SingleServerWriteClient>>,
    connected_server: Option<ServerDetail>,
    state: ConnectState,
    suppressed_close_failures: u64,
}

impl ServerIdAwareWriteClient {
    pub fn new(
        server_detail: ServerDetail,
        params: WriteSessionParams,
        use_pooled_connection: bool,
        factories: Arc<WriteClientFactories>,
        refresher: Option<Arc<dyn ServerConnectionRefresher>>,
    ) -> Self {
        Self {
            server_detail,
            params,
            use_pooled_connection,
            factories,
            refresher,
            write_client: None,
            connected_server: None,
            state: ConnectState::Unconnected,
            suppressed_close_failures: 0,
        }
    }

    /// The server this client was asked to connect to.
    pub fn server_detail(&self) -> &ServerDetail {
        &self.server_detail
    }

    /// The server actually connected to; differs from
    /// [`server_detail`](Self::server_detail) after a failover.
    pub fn connected_server(&self) -> Option<&ServerDetail> {
        self.connected_server.as_ref()
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }

    /// Close failures that were logged instead of returned.
    pub fn suppressed_close_failures(&self) -> u64 {
        self.suppressed_close_failures
    }

    async fn connect_with_failover(&mut self) -> Result<ConnectUploadResponse> {
        let mut target = self.server_detail.clone();
        // Taken on the first network failure, so the refreshed target is
        // attempted without one: at most two attempts per connect.
        let mut refresher = self.refresher.clone();

        loop {
            let error = match self.connect_to(&target).await {
                Err(e) if e.is_network() => e,
                result => return result,
            };

            let Some(refresher) = refresher.take() else {
                return Err(error);
            };

            warn!("Failed to connect, retrying: {}, error: {}", target, error);
            CONNECT_FAILOVERS.inc();
            let refreshed = refresher.refresh_connection(&target).await?;
            info!("Retry with {} for {}", refreshed, target);
            target = refreshed;
        }
    }

    /// One attempt: acquire, handshake, validate. On any failure the
    /// underlying client is discarded before returning, so a pooled
    /// connection to the wrong or unreachable server is never reused.
    async fn connect_to(
        &mut self,
        target: &ServerDetail,
    ) -> Result<ConnectUploadResponse> {
        self.close_underlying_client().await;

        let response = match self.acquire_and_handshake(target).await {
            Ok(response) => response,
            Err(e) => {
                self.discard_underlying_client().await;
                return Err(e);
            }
        };

        if let Err(e) = validate_connect_response(target, &response) {
            let reason = match e.kind() {
                ErrorKind::InvalidServerId => "server_id",
                _ => "server_version",
            };
            CONNECT_REJECTIONS.with_label_values(&[reason]).inc();
            self.discard_underlying_client().await;
            return Err(e);
        }

        debug!("Connected to {}", target);
        self.connected_server = Some(target.clone());
        Ok(response)
    }

    async fn acquire_and_handshake(
        &mut self,
        target: &ServerDetail,
    ) -> Result<ConnectUploadResponse> {
        let host_and_port = target.host_and_port()?;
        let factory = self.factories.select(self.use_pooled_connection).clone();
        let client = factory.get_or_create_client(&host_and_port, &self.params).await?;
        self.write_client.insert(client).connect().await
    }

    async fn close_underlying_client(&mut self) {
        self.connected_server = None;
        if let Some(mut client) = self.write_client.take() {
            if let Err(e) = client.close().await {
                self.suppressed_close_failures += 1;
                SUPPRESSED_CLOSE_FAILURES.inc();
                warn!("Failed to close underlying client for {}: {}", self.server_detail, e);
            }
        }
    }

    async fn discard_underlying_client(&mut self) {
        if let Some(client) = self.write_client.as_mut() {
            client.invalidate();
        }
        self.close_underlying_client().await;
    }

    fn active_client(&mut self) -> Result<&mut Box<dyn SingleServerWriteClient>> {
        let server = &self.server_detail;
        self.write_client
            .as_mut()
            .ok_or_else(|| Error::NotConnected(server.to_string()))
    }
}

/// Rejects a handshake from a server other than `expected`, or from a
/// different build of it. A server that does not report its version is only
/// checked by id.
pub(crate) fn validate_connect_response(
    expected: &ServerDetail,
    response: &ConnectUploadResponse,
) -> Result<()> {
    if response.server_id != expected.server_id() {
        return Err(ConnectError::InvalidServerId {
            actual: response.server_id.clone(),
            expected: expected.clone(),
        }
        .into());
    }

    if let Some(version) = response.running_version.as_deref() {
        if Some(version) != expected.running_version() {
            return Err(ConnectError::InvalidServerVersion {
                actual: version.to_string(),
                expected: expected.clone(),
            }
            .into());
        }
    }

    Ok(())
}

#[async_trait]
impl SingleServerWriteClient for ServerIdAwareWriteClient {
    async fn connect(&mut self) -> Result<ConnectUploadResponse> {
        self.state = ConnectState::Connecting;
        let result = self.connect_with_failover().await;
        self.state = match result {
            Ok(_) => ConnectState::Connected,
            Err(_) => ConnectState::Failed,
        };
        result
    }

    async fn start_upload(
        &mut self,
        app_task_attempt_id: &AppTaskAttemptId,
        num_maps: u32,
        num_partitions: u32,
    ) -> Result<()> {
        self.active_client()?
            .start_upload(app_task_attempt_id, num_maps, num_partitions)
            .await
    }

    async fn send_record(
        &mut self,
        partition: u32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
    ) -> Result<()> {
        self.active_client()?.send_record(partition, key, value).await
    }

    async fn finish_upload(&mut self) -> Result<()> {
        self.active_client()?.finish_upload().await
    }

    fn get_shuffle_write_bytes(&self) -> u64 {
        self.write_client
            .as_ref()
            .map_or(0, |client| client.get_shuffle_write_bytes())
    }

    fn invalidate(&mut self) {
        if let Some(client) = self.write_client.as_mut() {
            client.invalidate();
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.close_underlying_client().await;
        self.state = ConnectState::Unconnected;
        Ok(())
    }
}

impl fmt::Display for ServerIdAwareWriteClient {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ServerIdAwareWriteClient{{serverDetail={}}}", self.server_detail)
    }
}

impl fmt::Debug for ServerIdAwareWriteClient {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ServerIdAwareWriteClient")
            .field("server_detail", &self.server_detail)
            .field("connected_server", &self.connected_server)
            .field("state", &self.state)
            .field("use_pooled_connection", &self.use_pooled_connection)
            .finish()
    }
}
