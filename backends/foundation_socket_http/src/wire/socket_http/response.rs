//! Inbound response value and the capability that constructs it.

use super::headers::Headers;
use super::request::DEFAULT_PROTOCOL_VERSION;

/// An HTTP response. The body type is filled in by the parser once the
/// header block has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<B = ()> {
    status: u16,
    reason: String,
    protocol_version: String,
    headers: Headers,
    body: B,
}

impl Response<()> {
    #[must_use]
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            headers: Headers::new(),
            body: (),
        }
    }
}

impl<B> Response<B> {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// All values of `name`, empty when absent.
    #[must_use]
    pub fn header(&self, name: &str) -> &[String] {
        self.headers.get(name)
    }

    #[must_use]
    pub fn header_line(&self, name: &str) -> Option<String> {
        self.headers.get_line(name)
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_added_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Swaps the body, keeping status line and headers.
    pub fn with_body<T>(self, body: T) -> Response<T> {
        Response {
            status: self.status,
            reason: self.reason,
            protocol_version: self.protocol_version,
            headers: self.headers,
            body,
        }
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn into_body(self) -> B {
        self.body
    }
}

/// Builds a response from a status code and reason phrase.
pub trait ResponseFactory {
    fn create_response(&self, status: u16, reason: &str) -> Response;
}

impl<F> ResponseFactory for F
where
    F: Fn(u16, &str) -> Response,
{
    fn create_response(&self, status: u16, reason: &str) -> Response {
        self(status, reason)
    }
}

/// Factory that keeps the reason phrase as sent, falling back to the
/// standard phrase when the server sent none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn create_response(&self, status: u16, reason: &str) -> Response {
        let reason = if reason.is_empty() {
            canonical_reason(status).unwrap_or_default()
        } else {
            reason
        };
        Response::new(status, reason)
    }
}

/// Standard reason phrase for a status code.
#[must_use]
pub fn canonical_reason(status: u16) -> Option<&'static str> {
    let reason = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        426 => "Upgrade Required",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory_fills_reason() {
        let response = DefaultResponseFactory.create_response(404, "");
        assert_eq!(response.reason(), "Not Found");

        let response = DefaultResponseFactory.create_response(200, "Fine");
        assert_eq!(response.reason(), "Fine");

        let response = DefaultResponseFactory.create_response(599, "");
        assert_eq!(response.reason(), "");
    }

    #[test]
    fn test_closure_is_a_factory() {
        let factory = |status: u16, _: &str| Response::new(status, "custom");
        assert_eq!(factory.create_response(201, "").reason(), "custom");
    }

    /// WHY: Repeated headers like Set-Cookie must not overwrite each other
    /// WHAT: with_added_header keeps every value under one key
    #[test]
    fn test_added_headers_accumulate() {
        let response = Response::new(200, "OK")
            .with_added_header("Set-Cookie", "a=1")
            .with_added_header("set-cookie", "b=2")
            .with_protocol_version("1.0")
            .with_body("text");

        assert_eq!(response.header("SET-COOKIE"), ["a=1", "b=2"]);
        assert_eq!(response.protocol_version(), "1.0");
        assert_eq!(*response.body(), "text");
    }
}
