//! Session lifecycle — admission, message loop, and departure for one
//! connection.
//!
//! ```text
//! Connecting ──(identity)──▶ Admitting ──(registered)──▶ Active ──(stream ends)──▶ Closing ──▶ Closed
//!      │                          │
//!      └──(no identity)───────────┴──(duplicate)──────────────────────────────────────────▶ Closed
//! ```

use futures_util::StreamExt;
use relay_protocol::{ClientFrame, Identity, Notification, RelayError};
use relay_transport::{ConnectionHandle, InboundFrames, TransportError};
use tracing::{debug, info, warn};

use crate::router::MessageRouter;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, identity not yet examined.
    Connecting,
    /// Identity valid, registry admission in progress.
    Admitting,
    /// Registered and reading frames.
    Active,
    /// Read loop over, leaving the registry.
    Closing,
    Closed,
}

/// How a session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Admission failed; the client was told why.
    Rejected(RelayError),
    /// The peer closed the connection.
    Disconnected,
    /// Receiving failed. Cleanup ran the same as for a disconnect.
    TransportFault(TransportError),
}

/// One client's session.
pub struct Session {
    handle: ConnectionHandle,
    router: MessageRouter,
    state: SessionState,
    identity: Option<Identity>,
}

impl Session {
    pub fn new(handle: ConnectionHandle, router: MessageRouter) -> Self {
        Self {
            handle,
            router,
            state: SessionState::Connecting,
            identity: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The admitted identity, once past admission.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Drive the session until the client goes away.
    ///
    /// Never fails: every error is reported to the client or logged, and the
    /// registry is left without this session's entry.
    pub async fn run(&mut self, username: Option<String>, mut inbound: InboundFrames) -> SessionEnd {
        let identity = match self.admit(username.as_deref()) {
            Ok(identity) => identity,
            Err(err) => {
                self.reject(&err).await;
                return SessionEnd::Rejected(err);
            }
        };

        info!("User joined: {identity} (connection {})", self.handle.id());
        self.router.announce_join(&identity).await;

        let end = self.receive_loop(&identity, &mut inbound).await;

        self.depart(&identity).await;
        end
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Connection {}: {:?} -> {:?}", self.handle.id(), self.state, next);
        self.state = next;
    }

    fn admit(&mut self, username: Option<&str>) -> Result<Identity, RelayError> {
        let identity = Identity::from_param(username)?;
        self.transition(SessionState::Admitting);

        self.router
            .registry()
            .try_register(identity.clone(), self.handle.clone())?;

        self.transition(SessionState::Active);
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn reject(&mut self, err: &RelayError) {
        info!("Connection {} rejected: {err}", self.handle.id());
        if let Err(e) = self.handle.send(Notification::error(err)).await {
            debug!("Could not report rejection: {e}");
        }
        self.handle.close().await;
        self.transition(SessionState::Closed);
    }

    async fn receive_loop(&mut self, identity: &Identity, inbound: &mut InboundFrames) -> SessionEnd {
        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(text) => self.dispatch(identity, &text).await,
                Err(e) => {
                    warn!("Receive failed for {identity}: {e}");
                    return SessionEnd::TransportFault(e);
                }
            }
        }
        SessionEnd::Disconnected
    }

    /// Route one inbound frame. Completes before the next frame is read.
    async fn dispatch(&self, identity: &Identity, text: &str) {
        match ClientFrame::parse(text) {
            Ok(ClientFrame::Broadcast { body }) => {
                self.router.relay(identity, &body).await;
            }
            Ok(ClientFrame::Private { recipient, body }) => {
                let outcome = self.router.send_private(identity, &recipient, &body).await;
                debug!("Private {identity} -> {recipient}: {outcome:?}");
            }
            Err(err) => {
                debug!("Bad frame from {identity}: {err}");
                if let Err(e) = self.handle.send(Notification::error(&err)).await {
                    debug!("Could not report format error to {identity}: {e}");
                }
            }
        }
    }

    /// Unregister first, then announce, so the notice skips this client.
    async fn depart(&mut self, identity: &Identity) {
        self.transition(SessionState::Closing);

        self.router.registry().unregister(identity.as_str());
        self.router.announce_departure(identity).await;
        self.handle.close().await;

        self.transition(SessionState::Closed);
        info!(
            "User left: {identity} (connected {:.1}s)",
            self.handle.connected_for().as_secs_f64()
        );
    }
}
