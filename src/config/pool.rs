use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Limits of the pooled connection registry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle connections kept per (server, session parameters) key
    #[serde(default = "default_max_idle_per_key")]
    pub max_idle_per_key: usize,

    /// Idle connections unused for longer than this are closed on next checkout
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_key: default_max_idle_per_key(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "pool idle_timeout_ms must be > 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_idle_per_key() -> usize {
    8
}
fn default_idle_timeout_ms() -> u64 {
    300_000
}
