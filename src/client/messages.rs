//! Framed messages exchanged with a shuffle server.
//!
//! Every frame is a length-delimited bincode encoding of either
//! [`UploadRequest`] (client → server) or [`UploadResponse`]
//! (server → client).

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use super::ShuffleWriteConfig;
use crate::AppTaskAttemptId;
use crate::Result;

/// Identity a server reports about itself in the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectUploadResponse {
    pub server_id: String,
    pub running_version: Option<String>,
}

impl ConnectUploadResponse {
    pub fn new(
        server_id: impl Into<String>,
        running_version: Option<String>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            running_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadRequest {
    ConnectUpload {
        user: String,
        app_id: String,
        app_attempt: String,
        shuffle_write_config: ShuffleWriteConfig,
    },
    StartUpload {
        app_task_attempt_id: AppTaskAttemptId,
        num_maps: u32,
        num_partitions: u32,
    },
    SendRecord {
        partition: u32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
    },
    FinishUpload {
        ack: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadResponse {
    Connected(ConnectUploadResponse),
    FinishUploadAck,
    Error { message: String },
}

impl UploadRequest {
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(buf)?)
    }
}

impl UploadResponse {
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(buf)?)
    }
}
