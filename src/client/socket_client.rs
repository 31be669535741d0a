use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::codec::LengthDelimitedCodec;
use tracing::debug;
use tracing::trace;

use super::ConnectUploadResponse;
use super::SingleServerWriteClient;
use super::UploadRequest;
use super::UploadResponse;
use super::WriteSessionParams;
use crate::AppTaskAttemptId;
use crate::Error;
use crate::NetworkError;
use crate::Result;
use crate::ServerHostAndPort;
use crate::SystemError;

/// Size of the length prefix `LengthDelimitedCodec` puts before each frame.
const FRAME_HEADER_BYTES: u64 = 4;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Progress of the upload session running on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading,
    Finished,
}

/// One physical TCP connection to one shuffle server.
///
/// The socket is opened lazily by [`SingleServerWriteClient::connect`]. Any
/// transport failure marks the connection broken so a pool never hands it out
/// again.
#[derive(Debug)]
pub struct RecordSocketWriteClient {
    connection_id: u64,
    target: ServerHostAndPort,
    params: WriteSessionParams,
    framed: Option<Framed<TcpStream, LengthDelimitedCodec>>,
    connect_response: Option<ConnectUploadResponse>,
    upload_state: UploadState,
    broken: bool,
    write_bytes: u64,
    last_used: Instant,
}

impl RecordSocketWriteClient {
    pub fn new(
        target: ServerHostAndPort,
        params: WriteSessionParams,
    ) -> Self {
        Self {
            connection_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            target,
            params,
            framed: None,
            connect_response: None,
            upload_state: UploadState::Idle,
            broken: false,
            write_bytes: 0,
            last_used: Instant::now(),
        }
    }

    /// Process-unique handle of the physical connection.
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn target(&self) -> &ServerHostAndPort {
        &self.target
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload_state
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some() && self.connect_response.is_some()
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    /// A connection may carry another session only if the previous one left
    /// the protocol in a known state: nothing uploaded yet, or an upload the
    /// server acknowledged.
    pub fn is_reusable(&self) -> bool {
        self.is_connected()
            && !self.broken
            && match self.upload_state {
                UploadState::Idle => true,
                UploadState::Uploading => false,
                UploadState::Finished => self.params.finish_upload_ack,
            }
    }

    /// Forgets the server identity learned on this socket, so the next
    /// `connect` repeats the handshake over it. A server that went away or
    /// was replaced since then surfaces as an error from that `connect`.
    pub(crate) fn expire_handshake(&mut self) {
        self.connect_response = None;
    }

    /// True when the socket can no longer carry a session: the peer closed
    /// it, reported an error, or sent bytes nobody asked for.
    pub(crate) fn peer_closed(&self) -> bool {
        let Some(framed) = &self.framed else {
            return true;
        };
        if !framed.read_buffer().is_empty() {
            return true;
        }

        let mut byte = [0u8; 1];
        match framed.get_ref().try_read(&mut byte) {
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => false,
            Ok(0) => {
                debug!(connection_id = self.connection_id, target = %self.target, "Peer closed pooled connection");
                true
            }
            _ => true,
        }
    }

    /// Clears per-session state before the connection is leased again.
    pub(crate) fn reset_session(&mut self) {
        self.upload_state = UploadState::Idle;
        self.write_bytes = 0;
        self.last_used = Instant::now();
    }

    async fn send_request(
        &mut self,
        request: UploadRequest,
    ) -> Result<()> {
        let addr = self.target.to_string();
        let frame = request.encode()?;
        let frame_bytes = frame.len() as u64 + FRAME_HEADER_BYTES;

        let framed = self.framed.as_mut().ok_or_else(|| Error::NotConnected(addr.clone()))?;
        let result = with_timeout(&addr, self.params.timeout(), async {
            framed
                .send(frame)
                .await
                .map_err(|source| Error::from(NetworkError::Io { addr: addr.clone(), source }))
        })
        .await;

        match result {
            Ok(()) => {
                self.write_bytes += frame_bytes;
                self.last_used = Instant::now();
                Ok(())
            }
            Err(e) => {
                self.broken = true;
                Err(e)
            }
        }
    }

    async fn read_response(&mut self) -> Result<UploadResponse> {
        let addr = self.target.to_string();
        let framed = self.framed.as_mut().ok_or_else(|| Error::NotConnected(addr.clone()))?;
        let result = with_timeout(&addr, self.params.timeout(), async {
            match framed.next().await {
                Some(Ok(buf)) => UploadResponse::decode(&buf),
                Some(Err(source)) => Err(Error::from(NetworkError::Io { addr: addr.clone(), source })),
                None => Err(Error::from(NetworkError::ConnectionClosed(addr.clone()))),
            }
        })
        .await;

        match result {
            Ok(UploadResponse::Error { message }) => {
                self.broken = true;
                Err(SystemError::Server { addr, message }.into())
            }
            Ok(response) => Ok(response),
            Err(e) => {
                self.broken = true;
                Err(e)
            }
        }
    }

    fn unexpected_response(
        &mut self,
        expected: &str,
        response: UploadResponse,
    ) -> Error {
        self.broken = true;
        SystemError::Protocol(format!(
            "expected {expected} from {}, got {response:?}",
            self.target
        ))
        .into()
    }

    async fn open_socket(&mut self) -> Result<()> {
        let addr = self.target.to_string();
        let host = self.target.host().to_string();
        let port = self.target.port();
        debug!(connection_id = self.connection_id, %addr, "Establishing shuffle upload connection");

        let stream = with_timeout(&addr, self.params.timeout(), async {
            TcpStream::connect((host.as_str(), port))
                .await
                .map_err(|source| Error::from(NetworkError::ConnectFailed { addr: addr.clone(), source }))
        })
        .await?;
        stream
            .set_nodelay(true)
            .map_err(|source| NetworkError::Io { addr: addr.clone(), source })?;
        self.framed = Some(Framed::new(stream, LengthDelimitedCodec::new()));
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected(self.target.to_string()))
        }
    }
}

#[async_trait]
impl SingleServerWriteClient for RecordSocketWriteClient {
    async fn connect(&mut self) -> Result<ConnectUploadResponse> {
        if let Some(response) = &self.connect_response {
            trace!(connection_id = self.connection_id, "Reusing established connection");
            return Ok(response.clone());
        }

        if self.framed.is_some() {
            trace!(connection_id = self.connection_id, "Repeating handshake on pooled socket");
        } else {
            self.open_socket().await?;
        }

        self.send_request(UploadRequest::ConnectUpload {
            user: self.params.user.clone(),
            app_id: self.params.app_id.clone(),
            app_attempt: self.params.app_attempt.clone(),
            shuffle_write_config: self.params.shuffle_write_config.clone(),
        })
        .await?;

        match self.read_response().await? {
            UploadResponse::Connected(response) => {
                debug!(
                    connection_id = self.connection_id,
                    server_id = %response.server_id,
                    "Connected to shuffle server"
                );
                self.connect_response = Some(response.clone());
                self.reset_session();
                Ok(response)
            }
            other => Err(self.unexpected_response("Connected", other)),
        }
    }

    async fn start_upload(
        &mut self,
        app_task_attempt_id: &AppTaskAttemptId,
        num_maps: u32,
        num_partitions: u32,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send_request(UploadRequest::StartUpload {
            app_task_attempt_id: app_task_attempt_id.clone(),
            num_maps,
            num_partitions,
        })
        .await?;
        self.upload_state = UploadState::Uploading;
        Ok(())
    }

    async fn send_record(
        &mut self,
        partition: u32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send_request(UploadRequest::SendRecord { partition, key, value }).await
    }

    async fn finish_upload(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let ack = self.params.finish_upload_ack;
        self.send_request(UploadRequest::FinishUpload { ack }).await?;

        if ack {
            match self.read_response().await? {
                UploadResponse::FinishUploadAck => {}
                other => return Err(self.unexpected_response("FinishUploadAck", other)),
            }
        }
        self.upload_state = UploadState::Finished;
        Ok(())
    }

    fn get_shuffle_write_bytes(&self) -> u64 {
        self.write_bytes
    }

    fn invalidate(&mut self) {
        self.broken = true;
    }

    async fn close(&mut self) -> Result<()> {
        self.connect_response = None;
        let Some(framed) = self.framed.take() else {
            return Ok(());
        };

        let addr = self.target.to_string();
        debug!(connection_id = self.connection_id, %addr, "Closing shuffle upload connection");
        let mut stream = framed.into_inner();
        with_timeout(&addr, self.params.timeout(), async {
            stream
                .shutdown()
                .await
                .map_err(|source| Error::from(NetworkError::Io { addr: addr.clone(), source }))
        })
        .await
    }
}

/// Bounds a network operation by the session timeout, reporting expiry as a
/// network-class error.
pub(crate) async fn with_timeout<T, F>(
    addr: &str,
    duration: Duration,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(NetworkError::Timeout {
            addr: addr.to_string(),
            duration,
        }
        .into()),
    }
}
