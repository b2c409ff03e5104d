//! Network capabilities: the channel abstraction and the pieces used to
//! open one (DNS, TCP, TLS).

pub mod channel;
pub mod dns;
pub mod errors;
pub mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub mod socket;

#[cfg(not(target_arch = "wasm32"))]
pub mod ssl;

pub use channel::*;
pub use dns::*;
pub use errors::*;
pub use memory::*;

#[cfg(not(target_arch = "wasm32"))]
pub use socket::*;
