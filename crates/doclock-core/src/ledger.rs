//! Bounded, newest-first history of lock events

use crate::{events::LockEvent, record::LockRecord};

/// Maximum number of events kept in a record's history
pub const HISTORY_LIMIT: usize = 20;

/// Prepend `event` and drop the oldest entries beyond [`HISTORY_LIMIT`].
///
/// Retained events keep their relative order.
#[must_use]
pub fn append(mut record: LockRecord, event: LockEvent) -> LockRecord {
    record.history.insert(0, event);
    record.history.truncate(HISTORY_LIMIT);
    record
}
