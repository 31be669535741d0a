use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tokio_util::codec::LengthDelimitedCodec;
use tracing::debug;

use crate::ConnectUploadResponse;
use crate::ServerDetail;
use crate::ServerHostAndPort;
use crate::UploadRequest;
use crate::UploadResponse;

/// What a mock server saw on its connections.
#[derive(Debug, Default)]
pub struct MockServerState {
    pub accepted_connections: AtomicUsize,
    pub requests: Mutex<Vec<UploadRequest>>,
}

/// In-process shuffle server answering the upload protocol.
pub struct MockShuffleServer {
    pub address: ServerHostAndPort,
    pub state: Arc<MockServerState>,
    _shutdown: oneshot::Sender<()>,
}

impl MockShuffleServer {
    /// Starts a server reporting `server_id`/`running_version` on an
    /// ephemeral local port.
    pub async fn start(
        server_id: &str,
        running_version: Option<&str>,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(MockServerState::default());
        let (tx, mut rx) = oneshot::channel::<()>();

        let identity = ConnectUploadResponse::new(server_id, running_version.map(str::to_string));
        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        accept_state.accepted_connections.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(serve_connection(stream, identity.clone(), accept_state.clone()));
                    }
                }
            }
        });

        Self {
            address: ServerHostAndPort::new("127.0.0.1", port),
            state,
            _shutdown: tx,
        }
    }

    /// Detail a client would look up for this server.
    pub fn detail(
        &self,
        server_id: &str,
        running_version: Option<&str>,
    ) -> ServerDetail {
        ServerDetail::new(server_id, self.address.to_string(), running_version.map(str::to_string))
    }

    pub fn accepted_connections(&self) -> usize {
        self.state.accepted_connections.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<UploadRequest> {
        self.state.requests.lock().await.clone()
    }
}

async fn serve_connection(
    stream: TcpStream,
    identity: ConnectUploadResponse,
    state: Arc<MockServerState>,
) {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    while let Some(Ok(buf)) = framed.next().await {
        let request = match UploadRequest::decode(&buf) {
            Ok(request) => request,
            Err(e) => {
                debug!("mock server failed to decode request: {}", e);
                break;
            }
        };
        state.requests.lock().await.push(request.clone());

        let response = match request {
            UploadRequest::ConnectUpload { .. } => Some(UploadResponse::Connected(identity.clone())),
            UploadRequest::FinishUpload { ack: true } => Some(UploadResponse::FinishUploadAck),
            _ => None,
        };

        if let Some(response) = response {
            if framed.send(response.encode().unwrap()).await.is_err() {
                break;
            }
        }
    }
}

/// Server that accepts a single connection, answers its handshake, then
/// closes both the connection and the listener.
///
/// The receiver fires once the socket is gone.
pub async fn start_one_shot_server(
    server_id: &str,
    running_version: Option<&str>,
) -> (ServerHostAndPort, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let identity = ConnectUploadResponse::new(server_id, running_version.map(str::to_string));
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(listener);

        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        if let Some(Ok(buf)) = framed.next().await {
            if let Ok(UploadRequest::ConnectUpload { .. }) = UploadRequest::decode(&buf) {
                let _ = framed.send(UploadResponse::Connected(identity).encode().unwrap()).await;
            }
        }
        drop(framed);
        let _ = closed_tx.send(());
    });

    (ServerHostAndPort::new("127.0.0.1", port), closed_rx)
}
