#![cfg(not(target_arch = "wasm32"))]

pub mod rustls;

pub use self::rustls::{client_config, handshake, ClientTlsStream};
