//! Write-side clients of the shuffle service
//!
//! Provides the components a map task uses to upload its output:
//! - [`ServerIdAwareWriteClient`] - Connects to a logical server, validates its
//!   identity and fails over once through a [`ServerConnectionRefresher`]
//! - [`WriteClientFactories`] - Pooled and unpooled acquisition strategies
//! - [`RecordSocketWriteClient`] - One physical TCP connection to one server
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use shuffle_write_client::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let settings = ClientSettings::new()?.validate()?;
//!     let factories = Arc::new(WriteClientFactories::new(settings.pool.clone()));
//!
//!     let server = ServerDetail::new("rss-1", "node1:19190", Some("1.0.0".to_string()));
//!     let mut client = ServerIdAwareWriteClient::new(
//!         server,
//!         settings.client.session_params("app_1", "0"),
//!         settings.client.use_pooled_connection,
//!         factories,
//!         None,
//!     );
//!
//!     client.connect().await?;
//!     client.start_upload(&AppTaskAttemptId::new("app_1", "0", 1, 7, 0), 10, 4).await?;
//!     client.send_record(2, None, Some(b"value".to_vec())).await?;
//!     client.finish_upload().await?;
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod factory;
mod messages;
mod pool;
mod refresher;
mod server_id_aware;
mod socket_client;

pub use factory::*;
pub use messages::*;
pub use pool::*;
pub use refresher::*;
pub use server_id_aware::*;
pub use socket_client::*;

#[cfg(test)]
mod refresher_test;

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::AppTaskAttemptId;
use crate::Result;

/// Server-side write tuning carried with every upload session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShuffleWriteConfig {
    /// Codec the server applies to shuffle files ("" for none)
    pub file_compression_codec: String,
    /// Number of files each partition is split across on the server
    pub num_splits: u16,
}

impl Default for ShuffleWriteConfig {
    fn default() -> Self {
        Self {
            file_compression_codec: String::new(),
            num_splits: 3,
        }
    }
}

/// Parameters identifying one logical upload session.
///
/// Passed unchanged from the façade through the factories to the physical
/// client. Together with host and port they form the pool key, so two
/// sessions only share a connection when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteSessionParams {
    pub timeout_millis: u64,
    pub finish_upload_ack: bool,
    pub user: String,
    pub app_id: String,
    pub app_attempt: String,
    pub shuffle_write_config: ShuffleWriteConfig,
}

impl WriteSessionParams {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

/// Upload protocol against a single shuffle server.
///
/// Calls within one session must follow
/// `connect → start_upload → send_record* → finish_upload → close`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SingleServerWriteClient: Send + Sync {
    /// Performs the handshake and returns the server's self-reported identity.
    async fn connect(&mut self) -> Result<ConnectUploadResponse>;

    async fn start_upload(
        &mut self,
        app_task_attempt_id: &AppTaskAttemptId,
        num_maps: u32,
        num_partitions: u32,
    ) -> Result<()>;

    /// `key` and `value` may each be absent.
    async fn send_record(
        &mut self,
        partition: u32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
    ) -> Result<()>;

    async fn finish_upload(&mut self) -> Result<()>;

    /// Bytes written in the current session, zero before any data is sent.
    fn get_shuffle_write_bytes(&self) -> u64;

    /// Marks the connection unusable, so the next `close` tears it down
    /// instead of keeping it for another session.
    fn invalidate(&mut self);

    /// Releases the connection. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}
