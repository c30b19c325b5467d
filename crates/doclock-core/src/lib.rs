//! doclock-core - advisory lock coordination for shared documents
//!
//! Every managed document carries its own lock record in a metadata block at
//! the head of its content. There is no lock server: agents read the record,
//! decide, and write it back through whatever versioned store propagates the
//! documents between them.
//!
//! This crate provides:
//! - The lock record data model and its codec
//! - The checkout / checkin / force-unlock state machine
//! - Staleness policy and the bounded history ledger
//! - The coordinator (one read, at most one write per operation)
//! - A read-only scan over the whole managed set
//! - Layered configuration

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod clock;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod events;
pub mod ledger;
pub mod record;
pub mod scan;
pub mod staleness;
pub mod state_machine;
pub mod store;

pub use agent::AgentId;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::CodecError;
pub use config::{load_config, Config, HooksConfig};
pub use coordinator::{CheckinResult, CheckoutResult, Coordinator, ForceUnlockResult, InitResult};
pub use document::DocumentId;
pub use error::{Error, Result};
pub use events::{LockAction, LockEvent};
pub use ledger::HISTORY_LIMIT;
pub use record::{Holder, LockRecord, LockState, LockStatus};
pub use scan::{LockClass, ScanEntry, ScanReport, ScanSummary, SkippedDocument, StaleLock};
pub use staleness::StalenessPolicy;
pub use state_machine::{CheckinPolicy, LockError, Operation, Outcome, Rules, Transition};
pub use store::{DocumentStore, FsStore, MemoryStore, StoreError, STATE_DIR};
