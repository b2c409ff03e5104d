//! Destination resolution from a request's target URI or `Host` header.

use crate::wire::socket_http::{Request, Uri};

/// Transport the connector must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportScheme {
    Tcp,
    Tls,
}

impl core::fmt::Display for TransportScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Tls => f.write_str("tls"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    MissingHost,
    InvalidHostHeader(String),
}

impl std::error::Error for EndpointError {}

impl core::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHost => write!(f, "cannot determine destination host"),
            Self::InvalidHostHeader(value) => write!(f, "invalid Host header: {value:?}"),
        }
    }
}

/// A connectable address. `host` never carries IPv6 brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: TransportScheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(scheme: TransportScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Works out where `request` should be sent.
    ///
    /// The URI host wins; without one the `Host` header is used, and its
    /// port when it carries one.
    pub fn resolve(request: &Request) -> Result<Self, EndpointError> {
        let uri = request.uri();
        let scheme = if uri.is_https() {
            TransportScheme::Tls
        } else {
            TransportScheme::Tcp
        };
        let default_port = default_port(uri);

        if let Some(host) = uri.host() {
            return Ok(Self::new(scheme, host, uri.port().unwrap_or(default_port)));
        }

        let header = request
            .header_line("Host")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(EndpointError::MissingHost)?;

        let (host, port) = split_host_port(&header)
            .ok_or_else(|| EndpointError::InvalidHostHeader(header.clone()))?;
        Ok(Self::new(scheme, host, port.unwrap_or(default_port)))
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.scheme == TransportScheme::Tls
    }
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

fn default_port(uri: &Uri) -> u16 {
    if uri.is_https() {
        443
    } else {
        80
    }
}

/// Splits `host[:port]`, accepting bracketed IPv6 literals.
fn split_host_port(value: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        if host.is_empty() {
            return None;
        }
        return match after {
            "" => Some((host, None)),
            _ => {
                let port = after.strip_prefix(':')?.parse().ok()?;
                Some((host, Some(port)))
            }
        };
    }

    match value.split_once(':') {
        // more than one colon is an unbracketed IPv6 literal
        Some((_, port)) if port.contains(':') => Some((value, None)),
        Some((host, port)) if !host.is_empty() => Some((host, Some(port.parse().ok()?))),
        Some(_) => None,
        None => Some((value, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::socket_http::Method;

    #[test]
    fn test_uri_host_and_default_ports() {
        let request = Request::build(Method::GET, "https://example.test/").unwrap();
        let endpoint = Endpoint::resolve(&request).unwrap();
        assert_eq!(endpoint, Endpoint::new(TransportScheme::Tls, "example.test", 443));
        assert_eq!(endpoint.to_string(), "tls://example.test:443");

        let request = Request::build(Method::GET, "http://example.test:8080/x").unwrap();
        let endpoint = Endpoint::resolve(&request).unwrap();
        assert_eq!(endpoint, Endpoint::new(TransportScheme::Tcp, "example.test", 8080));
    }

    /// WHY: Origin-form requests are routed by their Host header
    /// WHAT: Host header values with and without ports resolve
    #[test]
    fn test_host_header_fallback() {
        let request = Request::build(Method::GET, "/path")
            .unwrap()
            .with_header("Host", "api.example.test:9000");
        let endpoint = Endpoint::resolve(&request).unwrap();
        assert_eq!(endpoint, Endpoint::new(TransportScheme::Tcp, "api.example.test", 9000));

        let request = Request::build(Method::GET, "/path")
            .unwrap()
            .with_header("Host", "[::1]:8443");
        let endpoint = Endpoint::resolve(&request).unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.port, 8443);
        assert_eq!(endpoint.to_string(), "tcp://[::1]:8443");
    }

    #[test]
    fn test_missing_host_fails() {
        let request = Request::build(Method::GET, "/path").unwrap();
        assert_eq!(Endpoint::resolve(&request), Err(EndpointError::MissingHost));

        let request = Request::build(Method::GET, "/path")
            .unwrap()
            .with_header("Host", "  ");
        assert_eq!(Endpoint::resolve(&request), Err(EndpointError::MissingHost));
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("a.test"), Some(("a.test", None)));
        assert_eq!(split_host_port("a.test:81"), Some(("a.test", Some(81))));
        assert_eq!(split_host_port("[fe80::1]"), Some(("fe80::1", None)));
        assert_eq!(split_host_port("fe80::1"), Some(("fe80::1", None)));
        assert_eq!(split_host_port("a.test:http"), None);
        assert_eq!(split_host_port(":80"), None);
    }
}
