use derive_more::From;
use std::io;

/// DNS resolution errors.
#[derive(From, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Invalid hostname provided.
    #[from(ignore)]
    InvalidHost(String),

    /// No addresses found for the given hostname.
    #[from(ignore)]
    NoAddressesFound(String),

    /// I/O error during DNS resolution, kept with its OS code when known.
    #[from(ignore)]
    IoError(String, Option<i32>),
}

impl From<io::Error> for DnsError {
    fn from(err: io::Error) -> Self {
        DnsError::IoError(err.to_string(), err.raw_os_error())
    }
}

impl std::error::Error for DnsError {}

impl core::fmt::Display for DnsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHost(host) => write!(f, "Invalid hostname: {host:?}"),
            Self::NoAddressesFound(host) => write!(f, "No addresses found for host: {host}"),
            Self::IoError(err, _) => write!(f, "I/O error during DNS resolution: {err}"),
        }
    }
}

/// Failures while opening a channel to an endpoint.
#[derive(From, Debug)]
pub enum ConnectError {
    #[from]
    Dns(DnsError),

    /// TCP connect failed with the given OS error.
    #[from(ignore)]
    Connect(io::Error),

    /// TCP connect exceeded the configured timeout, with the OS error.
    #[from(ignore)]
    Timeout(String, io::Error),

    /// Host cannot be used as a TLS server name.
    #[from(ignore)]
    InvalidServerName(String),

    /// TLS configuration or handshake failure.
    #[from(ignore)]
    TlsHandshake(String),

    /// Socket option or other I/O failure after connecting.
    #[from(ignore)]
    IO(io::Error),
}

impl ConnectError {
    /// OS error code behind this failure, when there is one.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Dns(DnsError::IoError(_, code)) => *code,
            Self::Connect(err) | Self::IO(err) | Self::Timeout(_, err) => err.raw_os_error(),
            _ => None,
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dns(err) => Some(err),
            Self::Connect(err) | Self::IO(err) | Self::Timeout(_, err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dns(err) => write!(f, "DNS error: {err}"),
            Self::Connect(err) => write!(f, "Connection failed: {err}"),
            Self::Timeout(msg, err) => write!(f, "Connection timeout: {msg} ({err})"),
            Self::InvalidServerName(host) => write!(f, "Invalid TLS server name: {host}"),
            Self::TlsHandshake(msg) => write!(f, "Cannot enable tls: {msg}"),
            Self::IO(err) => write!(f, "I/O error: {err}"),
        }
    }
}

pub type ConnectResult<T> = std::result::Result<T, ConnectError>;
