//! Agent identity

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque identity of one running agent.
///
/// Supplied by the caller and embedded verbatim in lock records and events.
/// There is no registry: two processes that pick the same identity will
/// silently share a lock. That is a known hazard, not something this type
/// can prevent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Create a new agent ID
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidIdentifier` if the ID is empty, has surrounding
    /// whitespace, or contains a control character.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(Error::InvalidIdentifier(
                "agent id cannot be empty or whitespace-only".to_string(),
            ));
        }
        if id.trim() != id {
            return Err(Error::InvalidIdentifier(format!(
                "agent id '{id}' has leading or trailing whitespace"
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(Error::InvalidIdentifier(format!(
                "agent id {id:?} contains control characters"
            )));
        }

        Ok(Self(id))
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for AgentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
