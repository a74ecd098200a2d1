//! Server → client notifications and their wire rendering.
//!
//! Notifications are built by the router as structured values; the text
//! that reaches the socket is decided by a [`WireFormat`] at the transport
//! boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::identity::Identity;

/// Tag used for server-generated announcements.
pub const SERVER_TAG: &str = "SERVER";
/// Tag used for error notifications.
pub const ERROR_TAG: &str = "ERROR";
/// Tag used for inbound private messages.
pub const PRIVATE_TAG: &str = "PRIVATE";
/// Tag used for the sender-side echo of a private message.
pub const ECHO_TAG: &str = "TO";

/// One message delivered to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    /// Join/departure announcement.
    System { text: String },
    /// Ordinary relayed message.
    Broadcast { from: Identity, body: String },
    /// Private message addressed to the receiving client.
    Private { from: Identity, body: String },
    /// Confirmation of a private message the receiving client sent.
    Echo { to: Identity, body: String },
    Error { message: String },
}

impl Notification {
    pub fn joined(identity: &Identity) -> Self {
        Self::System { text: format!("{identity} has joined the chat.") }
    }

    pub fn left(identity: &Identity) -> Self {
        Self::System { text: format!("{identity} has left the chat.") }
    }

    pub fn broadcast(from: &Identity, body: impl Into<String>) -> Self {
        Self::Broadcast { from: from.clone(), body: body.into() }
    }

    pub fn private(from: &Identity, body: impl Into<String>) -> Self {
        Self::Private { from: from.clone(), body: body.into() }
    }

    pub fn echo(to: &Identity, body: impl Into<String>) -> Self {
        Self::Echo { to: to.clone(), body: body.into() }
    }

    pub fn error(err: &RelayError) -> Self {
        Self::Error { message: err.to_string() }
    }

    /// Render as a tagged line of text, e.g. `[PRIVATE] bob: hi`.
    pub fn to_text(&self) -> String {
        match self {
            Self::System { text } => format!("[{SERVER_TAG}] {text}"),
            Self::Broadcast { from, body } => format!("[{from}] {body}"),
            Self::Private { from, body } => format!("[{PRIVATE_TAG}] {from}: {body}"),
            Self::Echo { to, body } => format!("[{ECHO_TAG} {to}] {body}"),
            Self::Error { message } => format!("[{ERROR_TAG}] {message}"),
        }
    }

    /// Render as a JSON envelope, e.g. `{"kind":"private","from":"bob","body":"hi"}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// How notifications are encoded into outbound text frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Tagged text lines.
    #[default]
    Text,
    /// One JSON object per frame.
    Json,
}

impl WireFormat {
    pub fn render(&self, notification: &Notification) -> String {
        match self {
            Self::Text => notification.to_text(),
            // Serialization of these plain variants cannot fail; fall back to
            // text rather than dropping the frame if it ever does.
            Self::Json => notification.to_json().unwrap_or_else(|_| notification.to_text()),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown wire format: {other} (expected text or json)")),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}
