//! Chat relay transport layer
//!
//! Provides the WebSocket transport for the relay. The transport handles:
//! - Connection lifecycle (upgrade, read loop, close)
//! - One single-writer outbound queue per connection
//! - HTTP liveness/health endpoints and CORS
//!
//! The transport is decoupled from chat semantics via the `SessionHandler` trait.

pub mod connection;
pub mod server;

pub use connection::{ConnectionHandle, InboundFrames, Outbound, TransportError};
pub use server::{SessionHandler, TransportConfig, TransportServer};
