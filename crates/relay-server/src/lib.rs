//! Chat relay server — membership and message routing.
//!
//! The server owns the shared [`ConnectionRegistry`], routes broadcasts and
//! private messages through the [`MessageRouter`], and provides the
//! `SessionHandler` implementation for the transport layer.

pub mod registry;
pub mod router;
pub mod server;
pub mod session;

pub use registry::ConnectionRegistry;
pub use router::{MessageRouter, PrivateOutcome};
pub use server::ChatServer;
pub use session::{Session, SessionEnd, SessionState};
