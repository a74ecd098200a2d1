//! Chat relay protocol types.
//!
//! This crate is the single source of truth for the text protocol spoken
//! over a relay connection: who a client is ([`Identity`]), what a client
//! may send ([`ClientFrame`]), what the server sends back
//! ([`Notification`]), and which failures are reported to clients
//! ([`RelayError`]).

pub mod error;
pub mod frame;
pub mod identity;
pub mod notification;

pub use error::{ErrorKind, RelayError};
pub use frame::ClientFrame;
pub use identity::Identity;
pub use notification::{Notification, WireFormat};
