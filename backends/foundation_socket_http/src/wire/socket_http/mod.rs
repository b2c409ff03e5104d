//! HTTP/1.1 spoken directly over a [`crate::netcap::Channel`].

pub mod body;
pub mod client;
pub mod errors;
pub mod headers;
pub mod method;
pub mod request;
pub mod response;

pub use body::*;
pub use errors::*;
pub use headers::*;
pub use method::*;
pub use request::*;
pub use response::*;
