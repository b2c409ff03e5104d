//! Outbound request value.

use std::str::FromStr;

use super::body::RequestBody;
use super::headers::Headers;
use super::method::Method;

pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

/// Request target: either an absolute URI or an origin-form path.
///
/// Origin-form targets (`/path?query`) carry no host; the destination then
/// comes from the `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl Uri {
    /// Parses an absolute URI or an origin-form target.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        if raw.is_empty() || raw.starts_with('/') || raw == "*" {
            let (path, query) = match raw.split_once('?') {
                Some((path, query)) => (path, Some(query.to_string())),
                None => (raw, None),
            };
            return Ok(Self {
                scheme: None,
                host: None,
                port: None,
                path: path.to_string(),
                query,
            });
        }

        let parsed = url::Url::parse(raw)?;
        Ok(Self {
            scheme: Some(parsed.scheme().to_string()),
            host: parsed
                .host_str()
                .filter(|host| !host.is_empty())
                .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string()),
            port: parsed.port(),
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
        })
    }

    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Explicit port; default ports are not reported.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn is_https(&self) -> bool {
        self.scheme
            .as_deref()
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https"))
    }

    /// Value for a `Host` header: host, bracketed when IPv6, plus the port
    /// when one was given explicitly.
    #[must_use]
    pub fn authority(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Some(match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host,
        })
    }

    /// Origin-form target: path plus query, `/` when the path is empty.
    #[must_use]
    pub fn request_target(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}

impl FromStr for Uri {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(scheme), Some(authority)) = (&self.scheme, self.authority()) {
            write!(f, "{scheme}://{authority}")?;
        }
        f.write_str(&self.request_target())
    }
}

/// Everything about a request except its body. Cheap to clone, and what
/// errors carry for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub protocol_version: String,
    pub headers: Headers,
}

#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    body: RequestBody,
}

impl Request {
    /// Creates a request, adding a `Host` header derived from `uri` when it
    /// names a host.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut headers = Headers::new();
        if let Some(authority) = uri.authority() {
            headers.insert("Host", authority);
        }

        Self {
            head: RequestHead {
                method,
                uri,
                protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
                headers,
            },
            body: RequestBody::Empty,
        }
    }

    /// Shorthand for a request with a parsed target.
    pub fn build(method: impl Into<Method>, uri: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(method.into(), Uri::parse(uri)?))
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.head.protocol_version
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    #[must_use]
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    #[must_use]
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    #[must_use]
    pub fn into_parts(self) -> (RequestHead, RequestBody) {
        (self.head, self.body)
    }

    #[must_use]
    pub fn from_parts(head: RequestHead, body: RequestBody) -> Self {
        Self { head, body }
    }

    #[must_use]
    pub fn request_target(&self) -> String {
        self.head.uri.request_target()
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.head.headers.contains(name)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> &[String] {
        self.head.headers.get(name)
    }

    #[must_use]
    pub fn header_line(&self, name: &str) -> Option<String> {
        self.head.headers.get_line(name)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_added_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn without_header(mut self, name: &str) -> Self {
        self.head.headers.remove(name);
        self
    }

    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.head.protocol_version = version.into();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }
}
