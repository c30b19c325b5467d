//! Lock events recorded in each document's history

use chrono::{DateTime, Utc};
use strum::{Display, EnumString};

use crate::agent::AgentId;

/// Kind of lock transition an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum LockAction {
    /// Lock taken (possibly over a stale lock)
    Checkout,
    /// Lock released after editing
    Checkin,
    /// Lock reset to available without the holder's consent
    ForceUnlock,
}

/// One immutable entry of a document's lock history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    /// Agent that performed the transition
    pub agent: AgentId,
    /// What happened
    pub action: LockAction,
    /// When it happened
    pub at: DateTime<Utc>,
    /// Holder displaced by a reclaiming checkout or a force-unlock
    pub previous_holder: Option<AgentId>,
    /// Justification, mandatory for force-unlock
    pub reason: Option<String>,
}

impl LockEvent {
    /// Create a new event
    #[must_use]
    pub const fn new(agent: AgentId, action: LockAction, at: DateTime<Utc>) -> Self {
        Self {
            agent,
            action,
            at,
            previous_holder: None,
            reason: None,
        }
    }

    /// Record the holder this event displaced
    #[must_use]
    pub fn with_previous_holder(mut self, holder: Option<AgentId>) -> Self {
        self.previous_holder = holder;
        self
    }

    /// Record the reason for this event
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(LockAction::Checkout.to_string(), "checkout");
        assert_eq!(LockAction::Checkin.to_string(), "checkin");
        assert_eq!(LockAction::ForceUnlock.to_string(), "force-unlock");
        assert_eq!(
            LockAction::from_str("force-unlock").unwrap(),
            LockAction::ForceUnlock
        );
        assert!(LockAction::from_str("force_unlock").is_err());
    }

    #[test]
    fn test_builder_sets_optional_fields() {
        let at = Utc::now();
        let event = LockEvent::new(AgentId::new("ops").unwrap(), LockAction::ForceUnlock, at)
            .with_previous_holder(Some(AgentId::new("a1").unwrap()))
            .with_reason("host died");

        assert_eq!(event.previous_holder.unwrap().as_str(), "a1");
        assert_eq!(event.reason.as_deref(), Some("host died"));
    }
}
