//! Socket-level client: endpoint resolution, connecting, request writing
//! and response parsing, wired together by [`SocketHttpClient`].

mod body_stream;
mod client;
mod connector;
mod endpoint;
mod writer;

pub mod parser;
pub mod serializer;

pub use body_stream::*;
pub use client::*;
pub use connector::*;
pub use endpoint::*;
pub use writer::*;
