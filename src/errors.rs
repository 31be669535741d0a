//! Shuffle Write Client Error Hierarchy
//!
//! Errors are grouped by the layer that raised them. Callers that need to
//! decide whether a failure is worth a failover should branch on
//! [`Error::kind`] rather than on the concrete variant.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

use crate::ServerDetail;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Handshake completed but the peer is not the expected server
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Upload call issued on a client without an established connection
    #[error("Write client is not connected: {0}")]
    NotConnected(String),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Coarse classification used by the failover logic.
///
/// Only [`ErrorKind::Network`] is eligible for the one-shot redirection in
/// [`crate::ServerIdAwareWriteClient::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    InvalidServerId,
    InvalidServerVersion,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::System(SystemError::Network(_)) => ErrorKind::Network,
            Error::Connect(ConnectError::InvalidServerId { .. }) => ErrorKind::InvalidServerId,
            Error::Connect(ConnectError::InvalidServerVersion { .. }) => ErrorKind::InvalidServerVersion,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Server id ({actual}) is not expected ({expected})")]
    InvalidServerId { actual: String, expected: ServerDetail },

    #[error("Server version ({actual}) is not expected ({expected})")]
    InvalidServerVersion { actual: String, expected: ServerDetail },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Network layer
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    //Serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Server answered with something the protocol does not allow here
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server reported a failure for the last request
    #[error("Server error from {addr}: {message}")]
    Server { addr: String, message: String },

    /// Service discovery could not resolve a server id
    #[error("Server {0} not found in service registry")]
    ServerNotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Socket connect failed (refused, unreachable, DNS failure)
    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Operation against a peer did not complete in time
    #[error("Timed out talking to {addr} after {duration:?}")]
    Timeout { addr: String, duration: Duration },

    /// Peer closed the connection while a response was expected
    #[error("Connection to {0} closed by peer")]
    ConnectionClosed(String),

    /// Read/write failure on an established connection
    #[error("I/O failure on connection to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failure without path context
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Disk I/O failure on a specific path
    #[error("{action} failed at path {path}: {source}")]
    PathError {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compression codec name not known to the storage layer
    #[error("Unsupported compression codec: {0}")]
    UnsupportedCodec(String),
}

// Serialization is classified separately (shared by wire messages and storage)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        SerializationError::Bincode(e).into()
    }
}
