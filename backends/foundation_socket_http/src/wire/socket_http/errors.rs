use std::sync::Arc;

use derive_more::From;

use super::request::RequestHead;
use crate::netcap::errors::ConnectError;

/// The request cannot be sent, whatever the network does.
#[derive(Debug, Clone)]
pub struct RequestError {
    pub request: Arc<RequestHead>,
    pub message: String,
}

impl RequestError {
    pub fn new(request: Arc<RequestHead>, message: impl Into<String>) -> Self {
        Self {
            request,
            message: message.into(),
        }
    }
}

impl std::error::Error for RequestError {}

impl core::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Request {} {} failed: {}",
            self.request.method, self.request.uri, self.message
        )
    }
}

/// Where in the exchange a network failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Dns,
    Connect,
    ConnectTimeout,
    TlsHandshake,
    Write,
    NoHeaders,
    TimedOut,
    MalformedStatusLine,
    Read,
    Closed,
}

impl core::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::ConnectTimeout => "connect timeout",
            Self::TlsHandshake => "tls handshake",
            Self::Write => "write",
            Self::NoHeaders => "no headers",
            Self::TimedOut => "timed out",
            Self::MalformedStatusLine => "malformed status line",
            Self::Read => "read",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Failure while connecting, writing or reading.
#[derive(Debug, Clone)]
pub struct NetworkError {
    pub request: Arc<RequestHead>,
    pub kind: NetworkErrorKind,
    pub message: String,
    /// OS error code, when the failure came from the OS.
    pub code: Option<i32>,
}

impl NetworkError {
    pub fn new(request: Arc<RequestHead>, kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            request,
            kind,
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: Option<i32>) -> Self {
        self.code = code;
        self
    }

    pub fn from_io(request: Arc<RequestHead>, kind: NetworkErrorKind, err: &std::io::Error) -> Self {
        Self::new(request, kind, err.to_string()).with_code(err.raw_os_error())
    }

    pub fn from_connect(request: Arc<RequestHead>, err: &ConnectError) -> Self {
        let kind = match err {
            ConnectError::Dns(_) => NetworkErrorKind::Dns,
            ConnectError::Connect(_) | ConnectError::IO(_) => NetworkErrorKind::Connect,
            ConnectError::Timeout(..) => NetworkErrorKind::ConnectTimeout,
            ConnectError::InvalidServerName(_) | ConnectError::TlsHandshake(_) => {
                NetworkErrorKind::TlsHandshake
            }
        };
        Self::new(request, kind, err.to_string()).with_code(err.os_code())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind,
            NetworkErrorKind::ConnectTimeout | NetworkErrorKind::TimedOut
        )
    }
}

impl std::error::Error for NetworkError {}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Network error ({}) for {} {}: {}",
            self.kind, self.request.method, self.request.uri, self.message
        )?;
        if let Some(code) = self.code {
            write!(f, " (os error {code})")?;
        }
        Ok(())
    }
}

/// What sending a request can fail with.
#[derive(From, Debug, Clone)]
pub enum HttpClientError {
    Request(RequestError),
    Network(NetworkError),
}

impl HttpClientError {
    #[must_use]
    pub fn request(&self) -> &RequestHead {
        match self {
            Self::Request(err) => &err.request,
            Self::Network(err) => &err.request,
        }
    }

    #[must_use]
    pub fn as_network(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(err) => Some(err),
            Self::Request(_) => None,
        }
    }
}

impl std::error::Error for HttpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(err) => Some(err),
            Self::Network(err) => Some(err),
        }
    }
}

impl core::fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(err) => write!(f, "{err}"),
            Self::Network(err) => write!(f, "{err}"),
        }
    }
}

pub type HttpClientResult<T> = std::result::Result<T, HttpClientError>;
