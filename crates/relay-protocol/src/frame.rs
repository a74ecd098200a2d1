//! Client → server frame grammar.
//!
//! ```text
//! @<recipient> <body>   private message (body is everything after the first space)
//! <anything else>       broadcast body, verbatim
//! ```

use crate::error::RelayError;

/// Prefix that marks a direct message.
pub const PRIVATE_PREFIX: char = '@';

/// A parsed inbound text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Broadcast { body: String },
    Private { recipient: String, body: String },
}

impl ClientFrame {
    /// Classify one inbound frame.
    ///
    /// A frame starting with `@` but lacking the space that separates the
    /// recipient from the body is a format error and routes nowhere.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let Some(rest) = text.strip_prefix(PRIVATE_PREFIX) else {
            return Ok(Self::Broadcast { body: text.to_string() });
        };

        match rest.split_once(' ') {
            Some((recipient, body)) => Ok(Self::Private {
                recipient: recipient.to_string(),
                body: body.to_string(),
            }),
            None => Err(RelayError::InvalidPrivateFormat),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private { .. })
    }
}
