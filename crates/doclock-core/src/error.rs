//! Error types for doclock-core

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::{
    agent::AgentId, codec::CodecError, document::DocumentId, staleness::format_age,
    store::StoreError,
};

/// Core error type for lock operations
///
/// Every variant is a returned value; none of them is used for normal
/// control flow. A failed operation never writes the document.
#[derive(Debug, Error)]
pub enum Error {
    /// An unexpired lock is held by another agent
    #[error("'{document}' is locked by {by} since {since} ({} ago)", format_age(.age))]
    AlreadyLocked {
        document: DocumentId,
        by: AgentId,
        since: DateTime<Utc>,
        age: Duration,
    },

    /// Force-unlock was requested without a justification
    #[error("force-unlock of '{document}' requires a reason")]
    MissingReason { document: DocumentId },

    /// Checkin by someone other than the holder under the holder-only policy
    #[error("'{document}' is locked by {holder}, not {agent}")]
    NotLockHolder {
        document: DocumentId,
        holder: AgentId,
        agent: AgentId,
    },

    /// The document's lock block is missing or invalid
    #[error("malformed lock record in '{document}': {source}")]
    MalformedRecord {
        document: DocumentId,
        #[source]
        source: CodecError,
    },

    /// Reading or writing the document failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration could not be loaded or failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An agent or document identifier was rejected
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl Error {
    /// Process exit code for this error category.
    ///
    /// - 1: caller input (missing reason, not holder, bad identifier, path or config)
    /// - 2: contention
    /// - 3: malformed record
    /// - 4: storage failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingReason { .. }
            | Self::NotLockHolder { .. }
            | Self::InvalidConfig(_)
            | Self::InvalidIdentifier(_)
            | Self::Store(StoreError::InvalidPath(_)) => 1,
            Self::AlreadyLocked { .. } => 2,
            Self::MalformedRecord { .. } => 3,
            Self::Store(_) => 4,
        }
    }

    /// Whether retrying later could succeed without human intervention.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::AlreadyLocked { .. })
    }
}

/// Result type alias for doclock-core operations
pub type Result<T> = std::result::Result<T, Error>;
