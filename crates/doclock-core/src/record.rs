//! Lock record data model
//!
//! # Invariants
//!
//! 1. `locked_by` and `locked_at` exist together, and only while the status
//!    is `Editing`. The `Holder` lives inside `LockState::Editing`, so no
//!    other combination can be built.
//! 2. `history` holds at most `HISTORY_LIMIT` events, newest first. Only the
//!    ledger adds events.

use chrono::{DateTime, Utc};
use serde_yaml::Mapping;
use strum::{Display, EnumString};

use crate::{agent::AgentId, events::LockEvent};

/// Serialized lock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum LockStatus {
    Available,
    Editing,
    Review,
}

/// Who holds a lock and since when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub agent: AgentId,
    pub since: DateTime<Utc>,
}

impl Holder {
    #[must_use]
    pub const fn new(agent: AgentId, since: DateTime<Utc>) -> Self {
        Self { agent, since }
    }
}

/// Lock state with the holder attached to the only state that has one
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Available,
    Editing(Holder),
    Review,
}

impl LockState {
    #[must_use]
    pub const fn status(&self) -> LockStatus {
        match self {
            Self::Available => LockStatus::Available,
            Self::Editing(_) => LockStatus::Editing,
            Self::Review => LockStatus::Review,
        }
    }

    #[must_use]
    pub const fn holder(&self) -> Option<&Holder> {
        match self {
            Self::Editing(holder) => Some(holder),
            Self::Available | Self::Review => None,
        }
    }
}

/// Authoritative lock state of one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockRecord {
    pub state: LockState,
    pub last_edited_by: Option<AgentId>,
    pub last_edited_at: Option<DateTime<Utc>>,
    /// Newest first
    pub history: Vec<LockEvent>,
    /// Other keys of the metadata block, kept verbatim and in order
    pub extra: Mapping,
}

impl LockRecord {
    /// A fresh, never-locked record
    #[must_use]
    pub fn available() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn status(&self) -> LockStatus {
        self.state.status()
    }

    #[must_use]
    pub const fn holder(&self) -> Option<&Holder> {
        self.state.holder()
    }

    #[must_use]
    pub fn locked_by(&self) -> Option<&AgentId> {
        self.holder().map(|h| &h.agent)
    }

    #[must_use]
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.holder().map(|h| h.since)
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Editing(_))
    }

    /// Most recent event, if any
    #[must_use]
    pub fn last_event(&self) -> Option<&LockEvent> {
        self.history.first()
    }
}
