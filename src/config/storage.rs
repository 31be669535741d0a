use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Local shuffle file storage settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for shuffle files
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Read/write buffer size in bytes; 0 leaves buffering to the OS page cache
    #[serde(default)]
    pub buffer_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            buffer_size: 0,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "storage root_dir cannot be empty".into(),
            )));
        }
        Ok(())
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/tmp/shuffle")
}
