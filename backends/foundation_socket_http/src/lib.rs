//! Socket-level HTTP/1.1 client.
//!
//! Speaks the protocol directly over a byte-stream channel: resolves the
//! destination from the request, opens a (TLS-upgraded when needed) socket,
//! writes the serialized request and parses the reply into a response whose
//! body is read lazily from the same socket.
//!
//! Each request owns its channel from connect to close; there is no pooling
//! or keep-alive.

pub mod config;
pub mod netcap;
pub mod wire;

pub use config::*;
