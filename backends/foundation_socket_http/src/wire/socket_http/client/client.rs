use std::sync::Arc;

use super::body_stream::BodyStream;
use super::connector::{Connector, TcpConnector};
use super::endpoint::Endpoint;
use super::{parser, serializer};
use crate::config::ClientConfig;
use crate::netcap::channel::Channel;
use crate::wire::socket_http::{
    DefaultResponseFactory, HttpClientResult, NetworkError, NetworkErrorKind, Request,
    RequestError, Response, ResponseFactory,
};

/// Sends one request per connection and returns the response with its body
/// still on the wire.
///
/// ```no_run
/// use foundation_socket_http::wire::socket_http::{client::SocketHttpClient, Method, Request};
/// use foundation_socket_http::ClientConfig;
///
/// let client = SocketHttpClient::new(ClientConfig::default());
/// let request = Request::build(Method::GET, "https://example.com/").unwrap();
/// let mut response = client.send_request(request).unwrap();
/// let text = response.body_mut().contents_string().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SocketHttpClient<C = TcpConnector, F = DefaultResponseFactory> {
    config: ClientConfig,
    connector: C,
    factory: F,
}

impl SocketHttpClient<TcpConnector, DefaultResponseFactory> {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connector: TcpConnector::new(),
            factory: DefaultResponseFactory,
        }
    }
}

impl Default for SocketHttpClient<TcpConnector, DefaultResponseFactory> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<C, F> SocketHttpClient<C, F>
where
    C: Connector,
    F: ResponseFactory,
{
    pub fn with_connector<T: Connector>(self, connector: T) -> SocketHttpClient<T, F> {
        SocketHttpClient {
            config: self.config,
            connector,
            factory: self.factory,
        }
    }

    pub fn with_response_factory<T: ResponseFactory>(self, factory: T) -> SocketHttpClient<C, T> {
        SocketHttpClient {
            config: self.config,
            connector: self.connector,
            factory,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects, writes `request` and reads the response head.
    ///
    /// The returned body owns the connection; dropping or closing it closes
    /// the socket.
    ///
    /// # Errors
    ///
    /// [`RequestError`] when no destination can be derived from the request,
    /// [`NetworkError`] for everything from connecting to reading the head.
    /// The connection is closed before an error is returned.
    pub fn send_request(
        &self,
        request: Request,
    ) -> HttpClientResult<Response<BodyStream<C::Channel>>> {
        let mut request = serializer::with_default_headers(request, &self.config);
        let head = Arc::new(request.head().clone());

        let endpoint = Endpoint::resolve(&request).map_err(|err| {
            tracing::error!("Cannot send {} {}: {}", head.method, head.uri, err);
            RequestError::new(head.clone(), err.to_string())
        })?;
        tracing::debug!("Sending {} {} to {}", head.method, head.uri, endpoint);

        let mut channel = self
            .connector
            .connect(&endpoint, &self.config)
            .map_err(|err| {
                tracing::error!("Connecting to {} failed: {}", endpoint, err);
                NetworkError::from_connect(head.clone(), &err)
            })?;

        if let Err(err) = serializer::write_request(&mut channel, &mut request, &self.config) {
            tracing::error!("Writing request to {} failed: {}", endpoint, err);
            if let Err(close_err) = channel.close() {
                tracing::debug!("Closing channel after failed write: {}", close_err);
            }
            return Err(NetworkError::new(head, NetworkErrorKind::Write, err.to_string())
                .with_code(err.os_code())
                .into());
        }

        parser::read_response(channel, &self.factory, head).map_err(|err| {
            tracing::error!("Reading response from {} failed: {}", endpoint, err);
            err.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcap::errors::ConnectResult;
    use crate::netcap::memory::{ChannelProbe, MemoryChannel, WriteStep};
    use crate::wire::socket_http::{HttpClientError, Method};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Connector handing out one prepared in-memory channel and recording
    /// where it was asked to connect.
    struct StubConnector {
        channel: Mutex<Option<MemoryChannel>>,
        endpoints: Mutex<Vec<Endpoint>>,
    }

    impl StubConnector {
        fn new(channel: MemoryChannel) -> Self {
            Self {
                channel: Mutex::new(Some(channel)),
                endpoints: Mutex::new(Vec::new()),
            }
        }
    }

    impl Connector for StubConnector {
        type Channel = MemoryChannel;

        fn connect(&self, endpoint: &Endpoint, _: &ClientConfig) -> ConnectResult<MemoryChannel> {
            self.endpoints.lock().unwrap().push(endpoint.clone());
            Ok(self.channel.lock().unwrap().take().expect("single use"))
        }
    }

    fn client_with(channel: MemoryChannel) -> (SocketHttpClient<StubConnector>, ChannelProbe) {
        let probe = channel.probe();
        let client = SocketHttpClient::new(ClientConfig::default())
            .with_connector(StubConnector::new(channel));
        (client, probe)
    }

    #[test]
    #[traced_test]
    fn test_round_trip_over_tls_endpoint() {
        let (client, probe) =
            client_with(MemoryChannel::new("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello"));

        let request = Request::build(Method::GET, "https://example.test:443/").unwrap();
        let mut response = client.send_request(request).unwrap();

        let endpoints = client.connector.endpoints.lock().unwrap().clone();
        assert!(endpoints[0].is_tls());
        assert_eq!(endpoints[0].port, 443);

        assert_eq!(response.status(), 200);
        assert_eq!(response.body_mut().get_contents().unwrap(), b"hello");
        assert!(response.body_mut().get_contents().unwrap().is_empty());

        let sent = probe.written_string();
        assert!(sent.starts_with("GET / HTTP/1.1\r\n"));
        assert!(sent.contains("Connection: close\r\n"));
        assert!(logs_contain("Sending GET"));
    }

    /// WHY: Unsendable requests must not open sockets
    /// WHAT: No host anywhere fails with RequestError before connecting
    #[test]
    fn test_missing_host_is_request_error() {
        let (client, probe) = client_with(MemoryChannel::new(""));
        let request = Request::build(Method::GET, "/nowhere").unwrap();

        let err = client.send_request(request).unwrap_err();
        assert!(matches!(err, HttpClientError::Request(_)));
        assert!(client.connector.endpoints.lock().unwrap().is_empty());
        assert_eq!(probe.write_calls(), 0);
    }

    #[test]
    fn test_write_failure_closes_channel() {
        let channel = MemoryChannel::new("HTTP/1.1 200 OK\r\n\r\n")
            .with_write_script([WriteStep::Zero, WriteStep::Zero])
            .with_writable_script([true]);
        let (client, probe) = client_with(channel);

        let request = Request::build(Method::GET, "http://example.test/").unwrap();
        let err = client.send_request(request).unwrap_err();

        assert_eq!(err.as_network().unwrap().kind, NetworkErrorKind::Write);
        assert!(probe.is_closed());
    }

    #[test]
    fn test_empty_response_is_network_error() {
        let (client, probe) = client_with(MemoryChannel::new(""));
        let request = Request::build(Method::GET, "http://example.test/").unwrap();

        let err = client.send_request(request).unwrap_err();
        assert_eq!(err.as_network().unwrap().kind, NetworkErrorKind::NoHeaders);
        assert!(probe.is_closed());
    }
}
