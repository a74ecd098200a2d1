//! Relay error taxonomy for client-visible failures.

use serde::{Deserialize, Serialize};

/// Broad classification of a [`RelayError`].
///
/// Admission errors end the connecting session; format and routing errors
/// are reported to the sender and the session stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Admission,
    ProtocolFormat,
    Routing,
}

impl ErrorKind {
    /// Whether the session survives an error of this kind.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Admission)
    }
}

/// Errors that are reported to the originating client as a notification.
///
/// The `Display` text is exactly what the client sees after the `[ERROR]` tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("No username provided.")]
    MissingIdentity,

    #[error("Username already taken.")]
    DuplicateIdentity(String),

    #[error("Invalid private message format. Use @username message.")]
    InvalidPrivateFormat,

    #[error("User {0} not found.")]
    RecipientNotFound(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingIdentity | Self::DuplicateIdentity(_) => ErrorKind::Admission,
            Self::InvalidPrivateFormat => ErrorKind::ProtocolFormat,
            Self::RecipientNotFound(_) => ErrorKind::Routing,
        }
    }
}
