use crate::netcap::errors::DnsError;
use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

/// Trait for DNS resolution.
///
/// Allows pluggable resolvers so connections can be pointed at local test
/// servers while the request keeps its real host name.
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname and port to socket addresses, in preference order.
    ///
    /// # Errors
    ///
    /// Returns `DnsError` if resolution fails or yields nothing.
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError>;
}

impl<R: DnsResolver + ?Sized> DnsResolver for Arc<R> {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        (**self).resolve(host, port)
    }
}

/// System DNS resolver using `std::net::ToSocketAddrs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

impl SystemDnsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for SystemDnsResolver {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        if host.is_empty() {
            return Err(DnsError::InvalidHost(host.to_string()));
        }

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(DnsError::from)?
            .collect();

        if addrs.is_empty() {
            return Err(DnsError::NoAddressesFound(host.to_string()));
        }

        Ok(addrs)
    }
}

/// Always resolves to one fixed address regardless of host and port.
#[derive(Debug, Clone, Copy)]
pub struct StaticSocketAddr(SocketAddr);

impl Default for StaticSocketAddr {
    /// Resolves to localhost port 80.
    fn default() -> Self {
        Self(SocketAddr::from(([127, 0, 0, 1], 80)))
    }
}

impl StaticSocketAddr {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl DnsResolver for StaticSocketAddr {
    fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        Ok(vec![self.0])
    }
}

/// Resolver answering from a fixed table, for tests.
#[derive(Debug, Clone, Default)]
pub struct MockDnsResolver {
    responses: HashMap<String, Result<Vec<SocketAddr>, DnsError>>,
}

impl MockDnsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures a successful response for a hostname.
    #[must_use]
    pub fn with_response(mut self, host: &str, addrs: Vec<SocketAddr>) -> Self {
        self.responses.insert(host.to_string(), Ok(addrs));
        self
    }

    /// Configures an error response for a hostname.
    #[must_use]
    pub fn with_error(mut self, host: &str, error: DnsError) -> Self {
        self.responses.insert(host.to_string(), Err(error));
        self
    }
}

impl DnsResolver for MockDnsResolver {
    fn resolve(&self, host: &str, _port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        self.responses
            .get(host)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::NoAddressesFound(host.to_string())))
    }
}
