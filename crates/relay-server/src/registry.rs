//! ConnectionRegistry — the identity → connection mapping used for routing.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use relay_protocol::{Identity, RelayError};
use relay_transport::ConnectionHandle;
use tracing::debug;

/// Shared mapping from display name to connection handle.
///
/// An identity is present exactly while its session can receive messages.
/// Uses parking_lot::RwLock (sync) and never holds the lock across an
/// `.await`; callers deliver to handles after the lock is released.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<Identity, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identity` if nobody holds it.
    ///
    /// The check and the insert happen under one write lock, so of several
    /// concurrent attempts for the same name exactly one succeeds.
    pub fn try_register(
        &self,
        identity: Identity,
        handle: ConnectionHandle,
    ) -> Result<(), RelayError> {
        match self.sessions.write().entry(identity) {
            Entry::Occupied(entry) => {
                Err(RelayError::DuplicateIdentity(entry.key().to_string()))
            }
            Entry::Vacant(entry) => {
                debug!("Registered {} on connection {}", entry.key(), handle.id());
                entry.insert(handle);
                Ok(())
            }
        }
    }

    /// Remove `identity`. Returns whether an entry was present.
    pub fn unregister(&self, identity: &str) -> bool {
        self.sessions.write().remove(identity).is_some()
    }

    /// Point lookup. The handle may be closed by the time it is used.
    pub fn lookup(&self, identity: &str) -> Option<ConnectionHandle> {
        self.sessions.read().get(identity).cloned()
    }

    /// Everyone registered right now, minus `exclude`.
    pub fn snapshot_recipients(&self, exclude: Option<&str>) -> Vec<(Identity, ConnectionHandle)> {
        self.sessions
            .read()
            .iter()
            .filter(|(identity, _)| Some(identity.as_str()) != exclude)
            .map(|(identity, handle)| (identity.clone(), handle.clone()))
            .collect()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.sessions.read().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
