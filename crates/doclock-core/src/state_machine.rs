//! Lock state machine
//!
//! `transition` is the only place that decides whether an operation is
//! allowed and what the next record looks like. It is pure: the caller
//! supplies `now`, and persisting the result is the coordinator's job.
//!
//! ```text
//!              checkout                  checkin
//!  Available ───────────► Editing ───────────────► Available
//!  Review    ───────────►    │    ── checkin --review ─► Review
//!                            │
//!                   checkout (stale) → Editing, new holder
//!
//!  force-unlock (with reason): any state → Available
//! ```

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    agent::AgentId,
    document::DocumentId,
    events::{LockAction, LockEvent},
    ledger,
    record::{Holder, LockRecord, LockState},
    staleness::StalenessPolicy,
    Error,
};

/// Who may check a document in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CheckinPolicy {
    /// Anyone may check in a locked document
    #[default]
    Permissive,
    /// Only the agent holding the lock may check it in
    HolderOnly,
}

impl<'de> Deserialize<'de> for CheckinPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for CheckinPolicy {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "holder-only" | "holder_only" | "strict" => Ok(Self::HolderOnly),
            _ => Err(Error::InvalidConfig(format!(
                "Invalid checkin policy: {s}. Must be one of: permissive, holder-only"
            ))),
        }
    }
}

impl std::fmt::Display for CheckinPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permissive => write!(f, "permissive"),
            Self::HolderOnly => write!(f, "holder-only"),
        }
    }
}

/// Rules the state machine consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rules {
    pub staleness: StalenessPolicy,
    pub checkin: CheckinPolicy,
}

/// Requested lock operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Checkout,
    /// Release the lock; `review` hands the document to review instead of
    /// making it available.
    Checkin { review: bool },
    ForceUnlock { reason: String },
}

/// Rejected transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("locked by {by} since {since}")]
    AlreadyLocked {
        by: AgentId,
        since: DateTime<Utc>,
        age: Duration,
    },

    #[error("force-unlock requires a reason")]
    MissingReason,

    #[error("locked by {holder}, not {agent}")]
    NotLockHolder { holder: AgentId, agent: AgentId },
}

impl LockError {
    /// Attach the document the rejection applies to.
    #[must_use]
    pub fn into_error(self, document: &DocumentId) -> Error {
        let document = document.clone();
        match self {
            Self::AlreadyLocked { by, since, age } => Error::AlreadyLocked {
                document,
                by,
                since,
                age,
            },
            Self::MissingReason => Error::MissingReason { document },
            Self::NotLockHolder { holder, agent } => Error::NotLockHolder {
                document,
                holder,
                agent,
            },
        }
    }
}

/// What an accepted operation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CheckedOut {
        /// Holder of the stale lock that was reclaimed
        reclaimed_from: Option<Holder>,
        /// The caller already held a live lock and refreshed it
        refreshed: bool,
    },
    CheckedIn {
        released: Holder,
        held: Duration,
    },
    /// Checkin on a document nobody holds; nothing changes
    NotLocked,
    ForceUnlocked {
        previous_holder: Option<Holder>,
    },
}

/// Next record plus what happened
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub record: LockRecord,
    pub outcome: Outcome,
}

impl Transition {
    /// True when the record is unchanged and must not be written.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self.outcome, Outcome::NotLocked)
    }
}

/// Validate `op` by `agent` against `record` and compute the next record.
///
/// Every accepted transition except the `NotLocked` no-op appends exactly
/// one event to the history.
///
/// # Errors
///
/// - `LockError::AlreadyLocked` when a live lock is held by another agent
/// - `LockError::MissingReason` when a force-unlock has a blank reason
/// - `LockError::NotLockHolder` for a non-holder checkin under
///   `CheckinPolicy::HolderOnly`
pub fn transition(
    record: &LockRecord,
    op: &Operation,
    agent: &AgentId,
    now: DateTime<Utc>,
    rules: &Rules,
) -> Result<Transition, LockError> {
    match op {
        Operation::Checkout => checkout(record, agent, now, rules),
        Operation::Checkin { review } => checkin(record, agent, now, *review, rules),
        Operation::ForceUnlock { reason } => force_unlock(record, agent, now, reason),
    }
}

fn checkout(
    record: &LockRecord,
    agent: &AgentId,
    now: DateTime<Utc>,
    rules: &Rules,
) -> Result<Transition, LockError> {
    let (reclaimed_from, refreshed) = match record.holder() {
        None => (None, false),
        Some(holder) if holder.agent == *agent => (None, true),
        Some(holder) if rules.staleness.is_stale(record, now) => (Some(holder.clone()), false),
        Some(holder) => {
            return Err(LockError::AlreadyLocked {
                by: holder.agent.clone(),
                since: holder.since,
                age: now - holder.since,
            })
        }
    };

    let event = LockEvent::new(agent.clone(), LockAction::Checkout, now)
        .with_previous_holder(reclaimed_from.as_ref().map(|h| h.agent.clone()));
    let next = LockRecord {
        state: LockState::Editing(Holder::new(agent.clone(), now)),
        ..record.clone()
    };

    Ok(Transition {
        record: ledger::append(next, event),
        outcome: Outcome::CheckedOut {
            reclaimed_from,
            refreshed,
        },
    })
}

fn checkin(
    record: &LockRecord,
    agent: &AgentId,
    now: DateTime<Utc>,
    review: bool,
    rules: &Rules,
) -> Result<Transition, LockError> {
    let Some(holder) = record.holder() else {
        return Ok(Transition {
            record: record.clone(),
            outcome: Outcome::NotLocked,
        });
    };

    if rules.checkin == CheckinPolicy::HolderOnly && holder.agent != *agent {
        return Err(LockError::NotLockHolder {
            holder: holder.agent.clone(),
            agent: agent.clone(),
        });
    }

    let event = LockEvent::new(agent.clone(), LockAction::Checkin, now);
    let next = LockRecord {
        state: if review {
            LockState::Review
        } else {
            LockState::Available
        },
        last_edited_by: Some(agent.clone()),
        last_edited_at: Some(now),
        ..record.clone()
    };

    Ok(Transition {
        record: ledger::append(next, event),
        outcome: Outcome::CheckedIn {
            released: holder.clone(),
            held: (now - holder.since).max(Duration::zero()),
        },
    })
}

fn force_unlock(
    record: &LockRecord,
    agent: &AgentId,
    now: DateTime<Utc>,
    reason: &str,
) -> Result<Transition, LockError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LockError::MissingReason);
    }

    let previous_holder = record.holder().cloned();
    let event = LockEvent::new(agent.clone(), LockAction::ForceUnlock, now)
        .with_previous_holder(previous_holder.as_ref().map(|h| h.agent.clone()))
        .with_reason(reason);
    let next = LockRecord {
        state: LockState::Available,
        ..record.clone()
    };

    Ok(Transition {
        record: ledger::append(next, event),
        outcome: Outcome::ForceUnlocked { previous_holder },
    })
}
