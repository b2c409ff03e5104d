//! Per-client configuration.
//!
//! All options are plain public fields with defaults, and can be loaded from
//! TOML where durations are expressed in milliseconds.

use std::time::Duration;

use derive_more::derive::From;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

/// Default timeout applied to connect and, unless overridden, to reads.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default size of the chunks the request body is streamed in.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 8192;

/// Default `User-Agent` sent when the request carries none.
pub const DEFAULT_USER_AGENT: &str = concat!("foundation-socket-http/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    IOError(std::io::Error),

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(err) => write!(f, "failed to read configuration: {err}"),
            Self::DeserializationFailed(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Lowest TLS protocol version the client will negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TlsVersion {
    #[default]
    #[serde(rename = "1.2", alias = "tls1.2", alias = "TLSv1.2")]
    Tls12,
    #[serde(rename = "1.3", alias = "tls1.3", alias = "TLSv1.3")]
    Tls13,
}

/// Configuration of a [`crate::wire::socket_http::client::SocketHttpClient`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for establishing the TCP connection.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_timeout: Duration,

    /// Read timeout on the channel; `None` reuses `connect_timeout`.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub read_timeout: Option<Duration>,

    pub tls_min_version: TlsVersion,

    pub verify_certificate: bool,

    /// Chunk size used when streaming the request body.
    pub write_buffer_size: usize,

    pub default_user_agent: String,

    /// How long the body write loop waits for the channel to become
    /// writable again after transient backpressure.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub write_stall_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            tls_min_version: TlsVersion::Tls12,
            verify_certificate: true,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            write_stall_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from TOML text; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        from_str(content)
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_path<V: Into<std::path::PathBuf>>(target: V) -> ConfigResult<Self> {
        from_path(target)
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_tls_min_version(mut self, version: TlsVersion) -> Self {
        self.tls_min_version = version;
        self
    }

    #[must_use]
    pub fn with_verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    #[must_use]
    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_default_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.default_user_agent = agent.into();
        self
    }

    #[must_use]
    pub fn with_write_stall_timeout(mut self, timeout: Duration) -> Self {
        self.write_stall_timeout = timeout;
        self
    }

    /// The read timeout actually applied to channels.
    #[must_use]
    pub fn effective_read_timeout(&self) -> Duration {
        self.read_timeout.unwrap_or(self.connect_timeout)
    }

    /// The body chunk size, never zero.
    #[must_use]
    pub fn effective_write_buffer_size(&self) -> usize {
        self.write_buffer_size.max(1)
    }
}

pub fn from_str<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config_obj: T = toml::from_str(content)?;
    Ok(config_obj)
}

pub fn from_path<T, V>(target: V) -> ConfigResult<T>
where
    T: DeserializeOwned,
    V: Into<std::path::PathBuf>,
{
    let target_path = target.into();
    let config_content = std::fs::read_to_string(target_path)?;
    from_str(&config_content)
}
