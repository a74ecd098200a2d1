//! Display-name identities used as routing keys.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// A validated, non-empty display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Build an identity from a requested name. Empty names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, RelayError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RelayError::MissingIdentity);
        }
        Ok(Self(name))
    }

    /// Resolve the optional `username` connection parameter.
    pub fn from_param(param: Option<&str>) -> Result<Self, RelayError> {
        param.map_or(Err(RelayError::MissingIdentity), Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets `HashMap<Identity, _>` be queried with a plain `&str`.
impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}
