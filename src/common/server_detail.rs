use std::fmt;
use std::str::FromStr;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Identity of a logical shuffle server.
///
/// `server_id` is stable for the server role; `connection_string` is only
/// where the role lives right now and may change when the server is
/// replaced. Instances are never mutated: a refresher hands out a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerDetail {
    server_id: String,
    connection_string: String,
    running_version: Option<String>,
}

impl ServerDetail {
    pub fn new(
        server_id: impl Into<String>,
        connection_string: impl Into<String>,
        running_version: Option<String>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            connection_string: connection_string.into(),
            running_version,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn running_version(&self) -> Option<&str> {
        self.running_version.as_deref()
    }

    /// Same logical server, regardless of where it currently runs.
    pub fn is_same_server(
        &self,
        other: &ServerDetail,
    ) -> bool {
        self.server_id == other.server_id
    }

    pub fn host_and_port(&self) -> Result<ServerHostAndPort> {
        self.connection_string.parse()
    }
}

impl fmt::Display for ServerDetail {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "ServerDetail{{serverId={}, connectionString={}, runningVersion={}}}",
            self.server_id,
            self.connection_string,
            self.running_version.as_deref().unwrap_or("null")
        )
    }
}

/// Physical location parsed from a `host:port` connection string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerHostAndPort {
    host: String,
    port: u16,
}

impl ServerHostAndPort {
    pub fn new(
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ServerHostAndPort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Split on the last colon so bracketed IPv6 literals keep their colons.
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(|| {
            Error::Config(ConfigError::Message(format!(
                "Invalid connection string {s:?}, expected host:port"
            )))
        })?;

        // Socket APIs take IPv6 literals without brackets.
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(Error::Config(ConfigError::Message(format!(
                "Invalid connection string {s:?}, host is empty"
            ))));
        }

        let port = port.parse::<u16>().map_err(|e| {
            Error::Config(ConfigError::Message(format!(
                "Invalid port in connection string {s:?}: {e}"
            )))
        })?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerHostAndPort {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
