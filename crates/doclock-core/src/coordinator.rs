//! Coordinator
//!
//! Binds the codec, the state machine and a store into the operations agents
//! call. Each mutating call reads the document once and writes it at most
//! once; a rejected operation or a no-op checkin writes nothing.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::{
    agent::AgentId,
    clock::{Clock, SystemClock},
    codec,
    document::DocumentId,
    error::{Error, Result},
    record::{LockRecord, LockStatus},
    scan::{self, ScanReport},
    state_machine::{transition, Operation, Outcome, Rules, Transition},
    store::{DocumentStore, StoreError},
};

/// Result of a granted checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResult {
    pub granted: bool,
    /// A stale lock held by someone else was taken over
    pub reclaimed_stale: bool,
    /// Holder of the reclaimed lock
    pub previous_holder: Option<AgentId>,
    /// The caller already held the lock and its timestamp was renewed
    pub refreshed: bool,
    pub locked_at: DateTime<Utc>,
}

/// Result of a checkin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinResult {
    /// False when the document was not locked and nothing changed
    pub was_locked: bool,
    pub held_duration: Option<Duration>,
    pub previous_holder: Option<AgentId>,
    /// Status the document is left in
    pub status: LockStatus,
}

/// Result of a forced unlock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceUnlockResult {
    pub previous_holder: Option<AgentId>,
}

/// Result of embedding a lock record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitResult {
    /// False when the document already carried a record
    pub created: bool,
}

/// Lock operations over a document store
#[derive(Debug)]
pub struct Coordinator<S, C = SystemClock> {
    store: S,
    clock: C,
    rules: Rules,
}

impl<S: DocumentStore> Coordinator<S> {
    /// Coordinator using the wall clock.
    #[must_use]
    pub const fn new(store: S, rules: Rules) -> Self {
        Self {
            store,
            clock: SystemClock,
            rules,
        }
    }
}

impl<S: DocumentStore, C: Clock> Coordinator<S, C> {
    #[must_use]
    pub const fn with_clock(store: S, clock: C, rules: Rules) -> Self {
        Self {
            store,
            clock,
            rules,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Take the editing lock on `doc` for `agent`.
    ///
    /// A live lock held by the same agent is refreshed. A stale lock held by
    /// another agent is reclaimed and the displaced holder is recorded.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyLocked` if another agent holds a live lock
    /// - `Error::MalformedRecord` if the record cannot be decoded
    /// - `Error::Store` on read or write failure
    pub fn checkout(&self, doc: &DocumentId, agent: &AgentId) -> Result<CheckoutResult> {
        let t = self.apply(doc, &Operation::Checkout, agent)?;
        let locked_at = t.record.locked_at().unwrap_or_else(|| self.clock.now());
        let (previous_holder, refreshed) = match t.outcome {
            Outcome::CheckedOut {
                reclaimed_from,
                refreshed,
            } => (reclaimed_from.map(|h| h.agent), refreshed),
            Outcome::CheckedIn { .. } | Outcome::NotLocked | Outcome::ForceUnlocked { .. } => {
                (None, false)
            }
        };

        if let Some(prev) = &previous_holder {
            warn!(document = %doc, agent = %agent, holder = %prev, "reclaimed stale lock");
        } else if refreshed {
            info!(document = %doc, agent = %agent, "lock refreshed");
        } else {
            info!(document = %doc, agent = %agent, "checked out");
        }

        Ok(CheckoutResult {
            granted: true,
            reclaimed_stale: previous_holder.is_some(),
            previous_holder,
            refreshed,
            locked_at,
        })
    }

    /// Release the lock on `doc`, leaving it available.
    ///
    /// Checking in a document nobody holds succeeds with
    /// `was_locked == false` and writes nothing.
    ///
    /// # Errors
    ///
    /// - `Error::NotLockHolder` under the holder-only policy
    /// - `Error::MalformedRecord` if the record cannot be decoded
    /// - `Error::Store` on read or write failure
    pub fn checkin(&self, doc: &DocumentId, agent: &AgentId) -> Result<CheckinResult> {
        self.release(doc, agent, false)
    }

    /// Release the lock on `doc` and hand it to review.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::checkin`].
    pub fn checkin_for_review(&self, doc: &DocumentId, agent: &AgentId) -> Result<CheckinResult> {
        self.release(doc, agent, true)
    }

    /// Reset `doc` to available regardless of who holds it.
    ///
    /// # Errors
    ///
    /// - `Error::MissingReason` if `reason` is blank
    /// - `Error::MalformedRecord` if the record cannot be decoded
    /// - `Error::Store` on read or write failure
    pub fn force_unlock(
        &self,
        doc: &DocumentId,
        agent: &AgentId,
        reason: &str,
    ) -> Result<ForceUnlockResult> {
        let op = Operation::ForceUnlock {
            reason: reason.to_string(),
        };
        let t = self.apply(doc, &op, agent)?;
        let previous_holder = match t.outcome {
            Outcome::ForceUnlocked { previous_holder } => previous_holder.map(|h| h.agent),
            Outcome::CheckedOut { .. } | Outcome::CheckedIn { .. } | Outcome::NotLocked => None,
        };

        warn!(
            document = %doc,
            agent = %agent,
            holder = ?previous_holder.as_ref().map(AgentId::as_str),
            reason = reason.trim(),
            "force-unlocked"
        );
        Ok(ForceUnlockResult { previous_holder })
    }

    /// Current record of `doc`. Never writes.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedRecord` if the record cannot be decoded
    /// - `Error::Store` on read failure
    pub fn status(&self, doc: &DocumentId) -> Result<LockRecord> {
        self.load(doc).map(|(record, _)| record)
    }

    /// Give `doc` a fresh available record if it has none.
    ///
    /// A missing document is created with an empty body.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedRecord` if an existing block is invalid
    /// - `Error::Store` on read or write failure
    pub fn init(&self, doc: &DocumentId, agent: &AgentId) -> Result<InitResult> {
        let raw = match self.store.read(doc) {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => String::new(),
            Err(e) => return Err(e.into()),
        };

        match codec::embed_new(&raw).map_err(|source| malformed(doc, source))? {
            Some(content) => {
                self.store.write(doc, &content)?;
                info!(document = %doc, agent = %agent, "lock record created");
                Ok(InitResult { created: true })
            }
            None => {
                debug!(document = %doc, "lock record already present");
                Ok(InitResult { created: false })
            }
        }
    }

    /// Classify every managed document. Never writes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the managed set cannot be listed.
    pub fn scan(&self) -> Result<ScanReport> {
        scan::scan(&self.store, self.clock.now(), &self.rules.staleness)
    }

    fn release(&self, doc: &DocumentId, agent: &AgentId, review: bool) -> Result<CheckinResult> {
        let t = self.apply(doc, &Operation::Checkin { review }, agent)?;
        let status = t.record.status();

        match t.outcome {
            Outcome::CheckedIn { released, held } => {
                info!(
                    document = %doc,
                    agent = %agent,
                    holder = %released.agent,
                    held_secs = held.num_seconds(),
                    status = %status,
                    "checked in"
                );
                Ok(CheckinResult {
                    was_locked: true,
                    held_duration: Some(held),
                    previous_holder: Some(released.agent),
                    status,
                })
            }
            Outcome::NotLocked | Outcome::CheckedOut { .. } | Outcome::ForceUnlocked { .. } => {
                warn!(document = %doc, agent = %agent, status = %status, "checkin on a document that is not locked");
                Ok(CheckinResult {
                    was_locked: false,
                    held_duration: None,
                    previous_holder: None,
                    status,
                })
            }
        }
    }

    fn load(&self, doc: &DocumentId) -> Result<(LockRecord, String)> {
        let raw = self.store.read(doc)?;
        codec::decode(&raw).map_err(|source| malformed(doc, source))
    }

    /// Read, decide, and write back unless rejected or a no-op.
    fn apply(&self, doc: &DocumentId, op: &Operation, agent: &AgentId) -> Result<Transition> {
        let (record, body) = self.load(doc)?;
        let now = self.clock.now();

        let t = transition(&record, op, agent, now, &self.rules).map_err(|e| {
            debug!(document = %doc, agent = %agent, error = %e, "transition rejected");
            e.into_error(doc)
        })?;

        if !t.is_noop() {
            let content = codec::encode(&t.record, &body).map_err(|source| malformed(doc, source))?;
            self.store.write(doc, &content)?;
        }
        Ok(t)
    }
}

fn malformed(doc: &DocumentId, source: codec::CodecError) -> Error {
    Error::MalformedRecord {
        document: doc.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{clock::ManualClock, store::MemoryStore, LockAction};

    const FRESH: &str = "---\nstatus: available\n---\n# Notes\n";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    fn agent(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    fn doc() -> DocumentId {
        DocumentId::parse("notes.md").unwrap()
    }

    fn setup(content: &str) -> Coordinator<MemoryStore, ManualClock> {
        let store = MemoryStore::with_documents([("notes.md", content)]).unwrap();
        Coordinator::with_clock(store, ManualClock::new(t0()), Rules::default())
    }

    #[test]
    fn test_checkout_writes_once() {
        let c = setup(FRESH);
        let result = c.checkout(&doc(), &agent("a1")).unwrap();

        assert!(result.granted);
        assert!(!result.reclaimed_stale);
        assert_eq!(result.locked_at, t0());
        assert_eq!(c.store().reads(), 1);
        assert_eq!(c.store().writes(), 1);

        let record = c.status(&doc()).unwrap();
        assert_eq!(record.locked_by(), Some(&agent("a1")));
    }

    #[test]
    fn test_contention_writes_nothing() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();
        let before = c.store().snapshot(&doc());

        c.clock.advance(Duration::minutes(30));
        let err = c.checkout(&doc(), &agent("a2")).unwrap_err();

        assert!(err.is_contention());
        assert_eq!(c.store().writes(), 1);
        assert_eq!(c.store().snapshot(&doc()), before);
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();

        c.clock.advance(Duration::minutes(90));
        let result = c.checkout(&doc(), &agent("a2")).unwrap();

        assert!(result.reclaimed_stale);
        assert_eq!(result.previous_holder, Some(agent("a1")));
        assert_eq!(result.locked_at, t0() + Duration::minutes(90));
    }

    #[test]
    fn test_checkin_reports_hold_time() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();
        c.clock.advance(Duration::minutes(20));

        let result = c.checkin(&doc(), &agent("a1")).unwrap();
        assert!(result.was_locked);
        assert_eq!(result.held_duration, Some(Duration::minutes(20)));
        assert_eq!(result.previous_holder, Some(agent("a1")));
        assert_eq!(result.status, LockStatus::Available);

        let record = c.status(&doc()).unwrap();
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[0].action, LockAction::Checkin);
        assert_eq!(record.history[1].action, LockAction::Checkout);
    }

    #[test]
    fn test_checkin_unlocked_is_noop() {
        let c = setup(FRESH);
        let result = c.checkin(&doc(), &agent("a1")).unwrap();

        assert!(!result.was_locked);
        assert_eq!(c.store().writes(), 0);
        assert_eq!(c.store().snapshot(&doc()).as_deref(), Some(FRESH));
    }

    #[test]
    fn test_checkin_for_review() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();
        let result = c.checkin_for_review(&doc(), &agent("a1")).unwrap();
        assert_eq!(result.status, LockStatus::Review);
        assert_eq!(c.status(&doc()).unwrap().status(), LockStatus::Review);
    }

    #[test]
    fn test_force_unlock_without_reason_leaves_record() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();
        let before = c.store().snapshot(&doc());

        let err = c.force_unlock(&doc(), &agent("ops"), "  ").unwrap_err();
        assert!(matches!(err, Error::MissingReason { .. }));
        assert_eq!(c.store().snapshot(&doc()), before);

        let result = c.force_unlock(&doc(), &agent("ops"), "crashed").unwrap();
        assert_eq!(result.previous_holder, Some(agent("a1")));
        assert_eq!(c.status(&doc()).unwrap().status(), LockStatus::Available);
    }

    #[test]
    fn test_body_survives_transitions() {
        let c = setup(FRESH);
        c.checkout(&doc(), &agent("a1")).unwrap();
        c.checkin(&doc(), &agent("a1")).unwrap();
        let content = c.store().snapshot(&doc()).unwrap();
        assert!(content.ends_with("---\n# Notes\n"));
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let c = setup("no metadata here\n");
        let err = c.checkout(&doc(), &agent("a1")).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
        assert_eq!(c.store().writes(), 0);
    }

    #[test]
    fn test_missing_document_is_store_error() {
        let c = setup(FRESH);
        let other = DocumentId::parse("other.md").unwrap();
        let err = c.checkout(&other, &agent("a1")).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn test_init_embeds_once() {
        let c = setup("# Plain\n");
        assert!(c.init(&doc(), &agent("a1")).unwrap().created);
        assert!(!c.init(&doc(), &agent("a1")).unwrap().created);
        assert_eq!(c.store().writes(), 1);

        let record = c.status(&doc()).unwrap();
        assert_eq!(record.status(), LockStatus::Available);
    }

    #[test]
    fn test_init_creates_missing_document() {
        let c = setup(FRESH);
        let new = DocumentId::parse("new.md").unwrap();
        assert!(c.init(&new, &agent("a1")).unwrap().created);
        assert_eq!(c.status(&new).unwrap().status(), LockStatus::Available);
    }
}
