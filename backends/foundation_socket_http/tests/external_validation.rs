//! Socket client against real servers.
//!
//! NOTE: These tests are #[ignore] by default (require network).
//! Run with: cargo test -- --ignored

#![cfg(not(target_arch = "wasm32"))]

use foundation_socket_http::wire::socket_http::client::SocketHttpClient;
use foundation_socket_http::wire::socket_http::{Method, Request};
use foundation_socket_http::{ClientConfig, TlsVersion};

/// WHY: Verify the TLS path works with a real certificate chain
/// WHAT: GET over https returns a sized body
#[test]
#[ignore]
fn test_external_https_get() {
    let client = SocketHttpClient::new(ClientConfig::default());
    let request = Request::build(Method::GET, "https://example.com/").unwrap();

    let mut response = client.send_request(request).unwrap();
    assert_eq!(response.status(), 200);
    assert!(response
        .body_mut()
        .contents_string()
        .unwrap()
        .contains("Example Domain"));
}

/// WHY: Verify plain HTTP over the system resolver
/// WHAT: GET over http returns a status line and headers
#[test]
#[ignore]
fn test_external_http_get() {
    let client = SocketHttpClient::new(ClientConfig::default());
    let request = Request::build(Method::GET, "http://example.com/").unwrap();

    let response = client.send_request(request).unwrap();
    assert!(response.status() >= 200);
    assert!(response.has_header("content-type"));
}

#[test]
#[ignore]
fn test_external_tls13_only() {
    let config = ClientConfig::default().with_tls_min_version(TlsVersion::Tls13);
    let client = SocketHttpClient::new(config);
    let request = Request::build(Method::HEAD, "https://example.com/").unwrap();

    assert!(client.send_request(request).is_ok());
}
