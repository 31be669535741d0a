use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::ShuffleWriteConfig;
use crate::WriteSessionParams;

/// Parameters shared by every upload session a process starts
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WriteClientConfig {
    /// Bound on every network operation, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Wait for the server to acknowledge `finish_upload`
    #[serde(default = "default_finish_upload_ack")]
    pub finish_upload_ack: bool,

    /// Lease connections from the shared pool instead of opening one per session
    #[serde(default = "default_use_pooled_connection")]
    pub use_pooled_connection: bool,

    /// User the uploads are attributed to
    #[serde(default = "default_user")]
    pub user: String,

    /// Codec the server applies to shuffle files ("" for none)
    #[serde(default)]
    pub file_compression_codec: String,

    /// Number of files per partition on the server
    #[serde(default = "default_num_splits")]
    pub num_splits: u16,
}

impl Default for WriteClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            finish_upload_ack: default_finish_upload_ack(),
            use_pooled_connection: default_use_pooled_connection(),
            user: default_user(),
            file_compression_codec: String::new(),
            num_splits: default_num_splits(),
        }
    }
}

impl WriteClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client timeout_ms must be > 0".into(),
            )));
        }

        if self.user.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "client user cannot be empty".into(),
            )));
        }

        if self.num_splits == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client num_splits must be > 0".into(),
            )));
        }

        Ok(())
    }

    pub fn shuffle_write_config(&self) -> ShuffleWriteConfig {
        ShuffleWriteConfig {
            file_compression_codec: self.file_compression_codec.clone(),
            num_splits: self.num_splits,
        }
    }

    /// Session parameters for one application attempt.
    pub fn session_params(
        &self,
        app_id: &str,
        app_attempt: &str,
    ) -> WriteSessionParams {
        WriteSessionParams {
            timeout_millis: self.timeout_ms,
            finish_upload_ack: self.finish_upload_ack,
            user: self.user.clone(),
            app_id: app_id.to_string(),
            app_attempt: app_attempt.to_string(),
            shuffle_write_config: self.shuffle_write_config(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_finish_upload_ack() -> bool {
    true
}
fn default_use_pooled_connection() -> bool {
    true
}
fn default_user() -> String {
    "unknown".to_string()
}
fn default_num_splits() -> u16 {
    3
}
