//! MessageRouter — broadcast and private delivery over the registry.

use std::sync::Arc;

use futures_util::future::join_all;
use relay_protocol::{Identity, Notification, RelayError};
use relay_transport::ConnectionHandle;
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// Result of a private message dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateOutcome {
    /// Delivered to the recipient and echoed to the sender.
    Delivered,
    /// Recipient not registered (or gone mid-send); sender was told.
    RecipientNotFound,
}

/// Routes notifications to registered sessions.
///
/// Deliveries go through each connection's outbound queue, so messages to a
/// single recipient keep their order and never interleave on the socket.
/// A failure to reach one recipient is logged and otherwise ignored.
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `notification` to everyone registered except `exclude`.
    /// Returns the number of recipients reached.
    pub async fn broadcast(&self, notification: Notification, exclude: Option<&str>) -> usize {
        let recipients = self.registry.snapshot_recipients(exclude);
        let attempted = recipients.len();

        let sends = recipients.iter().map(|(identity, handle)| {
            let notification = notification.clone();
            async move { deliver(identity, handle, notification).await }
        });
        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();

        debug!("Broadcast reached {delivered}/{attempted} recipients");
        delivered
    }

    /// Relay an ordinary message from `sender` to everyone else.
    pub async fn relay(&self, sender: &Identity, body: &str) -> usize {
        self.broadcast(Notification::broadcast(sender, body), Some(sender.as_str()))
            .await
    }

    /// Announce a join to everyone except the joiner.
    pub async fn announce_join(&self, identity: &Identity) -> usize {
        self.broadcast(Notification::joined(identity), Some(identity.as_str()))
            .await
    }

    /// Announce a departure to everyone still registered.
    ///
    /// Call after the departing identity has been unregistered so the notice
    /// never reaches the departing client itself.
    pub async fn announce_departure(&self, identity: &Identity) -> usize {
        self.broadcast(Notification::left(identity), None).await
    }

    /// Deliver a private message from `sender` to `recipient` and echo it
    /// back to the sender; tell the sender if the recipient is unknown.
    pub async fn send_private(
        &self,
        sender: &Identity,
        recipient: &str,
        body: &str,
    ) -> PrivateOutcome {
        // An empty recipient can never be registered, so both sides agree.
        let target = self
            .registry
            .lookup(recipient)
            .zip(Identity::new(recipient).ok());

        let delivered = match target {
            Some((handle, recipient_id)) => {
                deliver(&recipient_id, &handle, Notification::private(sender, body))
                    .await
                    .then_some(recipient_id)
            }
            None => None,
        };

        match delivered {
            Some(recipient_id) => {
                self.notify_sender(sender, Notification::echo(&recipient_id, body))
                    .await;
                PrivateOutcome::Delivered
            }
            None => {
                let err = RelayError::RecipientNotFound(recipient.to_string());
                self.notify_sender(sender, Notification::error(&err)).await;
                PrivateOutcome::RecipientNotFound
            }
        }
    }

    /// Deliver to the sender of a private message, if it is still registered.
    async fn notify_sender(&self, sender: &Identity, notification: Notification) {
        match self.registry.lookup(sender.as_str()) {
            Some(handle) => {
                deliver(sender, &handle, notification).await;
            }
            None => debug!("Sender {sender} left before private dispatch finished"),
        }
    }
}

/// Send to one recipient, isolating failure. Returns whether it was queued.
async fn deliver(identity: &Identity, handle: &ConnectionHandle, notification: Notification) -> bool {
    match handle.send(notification).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Delivery to {identity} failed: {e}");
            false
        }
    }
}
