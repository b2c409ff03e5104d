//! Opening channels to endpoints.

use std::io;
use std::net::{SocketAddr, TcpStream};

use super::endpoint::Endpoint;
use crate::config::ClientConfig;
use crate::netcap::channel::Channel;
use crate::netcap::dns::{DnsResolver, SystemDnsResolver};
use crate::netcap::errors::{ConnectError, ConnectResult};
use crate::netcap::socket::{SocketChannel, Transport};
use crate::netcap::ssl;

/// Opens a channel to an endpoint, upgrading to TLS when the endpoint asks
/// for it.
pub trait Connector {
    type Channel: Channel;

    /// # Errors
    ///
    /// Fails on DNS, TCP connect, connect timeout or TLS handshake errors.
    fn connect(&self, endpoint: &Endpoint, config: &ClientConfig) -> ConnectResult<Self::Channel>;
}

impl<C: Connector + ?Sized> Connector for &C {
    type Channel = C::Channel;

    fn connect(&self, endpoint: &Endpoint, config: &ClientConfig) -> ConnectResult<Self::Channel> {
        (**self).connect(endpoint, config)
    }
}

/// Connector over real sockets, with pluggable DNS.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector<R: DnsResolver = SystemDnsResolver> {
    resolver: R,
}

impl TcpConnector<SystemDnsResolver> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: DnsResolver> TcpConnector<R> {
    pub fn with_resolver(resolver: R) -> Self {
        Self { resolver }
    }

    fn connect_any(&self, endpoint: &Endpoint, config: &ClientConfig) -> ConnectResult<TcpStream> {
        let addrs = self.resolver.resolve(&endpoint.host, endpoint.port)?;

        let mut last_error = None;
        for addr in addrs {
            match open(addr, config) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    tracing::debug!("Connecting to {} ({}) failed: {}", endpoint, addr, err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ConnectError::Connect(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address to connect to for {endpoint}"),
            ))
        }))
    }
}

impl<R: DnsResolver> Connector for TcpConnector<R> {
    type Channel = SocketChannel;

    fn connect(&self, endpoint: &Endpoint, config: &ClientConfig) -> ConnectResult<SocketChannel> {
        let stream = self.connect_any(endpoint, config)?;
        tracing::debug!("Connected to {} via {:?}", endpoint, stream.peer_addr().ok());

        if !endpoint.is_tls() {
            return Ok(SocketChannel::new(Transport::Plain(stream)));
        }

        let tls_config = ssl::client_config(config.tls_min_version, config.verify_certificate)?;
        let tls_stream = ssl::handshake(tls_config, &endpoint.host, stream)?;
        Ok(SocketChannel::new(Transport::Tls(Box::new(tls_stream))))
    }
}

/// Opens one TCP connection and applies the channel timeouts.
fn open(addr: SocketAddr, config: &ClientConfig) -> ConnectResult<TcpStream> {
    let stream = TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(|err| {
        if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            ConnectError::Timeout(
                format!(
                    "{addr} did not answer within {:?}",
                    config.connect_timeout
                ),
                err,
            )
        } else {
            ConnectError::Connect(err)
        }
    })?;

    stream
        .set_read_timeout(Some(config.effective_read_timeout()))
        .map_err(ConnectError::IO)?;
    stream
        .set_write_timeout(Some(config.connect_timeout))
        .map_err(ConnectError::IO)?;
    stream.set_nodelay(true).map_err(ConnectError::IO)?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcap::dns::{MockDnsResolver, StaticSocketAddr};
    use crate::netcap::errors::DnsError;
    use crate::wire::socket_http::client::TransportScheme;
    use std::net::TcpListener;
    use std::time::Duration;

    /// WHY: Unreachable hosts must fail fast with a connect error, not hang
    /// WHAT: Connecting to a closed local port reports Connect with an OS code
    #[test]
    fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = TcpConnector::with_resolver(StaticSocketAddr::new(addr));
        let endpoint = Endpoint::new(TransportScheme::Tcp, "localhost", addr.port());
        let config = ClientConfig::default().with_connect_timeout(Duration::from_secs(2));

        match connector.connect(&endpoint, &config) {
            Err(err @ ConnectError::Connect(_)) => assert!(err.os_code().is_some()),
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_dns_failure_is_reported() {
        let resolver = MockDnsResolver::new()
            .with_error("nowhere.test", DnsError::NoAddressesFound("nowhere.test".into()));
        let connector = TcpConnector::with_resolver(resolver);
        let endpoint = Endpoint::new(TransportScheme::Tcp, "nowhere.test", 80);

        assert!(matches!(
            connector.connect(&endpoint, &ClientConfig::default()),
            Err(ConnectError::Dns(_))
        ));
    }

    /// WHY: Multi-homed hosts resolve to several addresses
    /// WHAT: A failing first address falls through to the next one
    #[test]
    fn test_tries_every_address() {
        let dead = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);

        let live = TcpListener::bind("127.0.0.1:0").unwrap();
        let live_addr = live.local_addr().unwrap();

        let resolver = MockDnsResolver::new().with_response("multi.test", vec![dead_addr, live_addr]);
        let connector = TcpConnector::with_resolver(resolver);
        let endpoint = Endpoint::new(TransportScheme::Tcp, "multi.test", live_addr.port());

        let channel = connector
            .connect(&endpoint, &ClientConfig::default())
            .expect("second address connects");
        assert_eq!(channel.peer_addr().unwrap(), live_addr);
        assert!(!channel.is_tls());
    }
}
