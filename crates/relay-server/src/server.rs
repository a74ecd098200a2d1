//! ChatServer — owns the registry and router and runs sessions for the
//! transport layer.

use std::sync::Arc;

use relay_transport::{ConnectionHandle, InboundFrames, SessionHandler};
use tracing::debug;

use crate::registry::ConnectionRegistry;
use crate::router::MessageRouter;
use crate::session::Session;

/// The chat relay server.
#[derive(Clone)]
pub struct ChatServer {
    router: MessageRouter,
}

impl ChatServer {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()))
    }

    /// Build on an existing registry (shared with e.g. tests or metrics).
    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            router: MessageRouter::new(registry),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.router.registry()
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandler for ChatServer {
    async fn run_session(
        &self,
        username: Option<String>,
        handle: ConnectionHandle,
        inbound: InboundFrames,
    ) {
        let mut session = Session::new(handle, self.router.clone());
        let end = session.run(username, inbound).await;
        debug!("Session finished: {end:?} ({} online)", self.registry().len());
    }
}
