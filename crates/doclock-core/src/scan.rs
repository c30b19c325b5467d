//! Fleet scan
//!
//! Read-only pass over every managed document. A document that cannot be
//! read or decoded is reported as skipped and never aborts the scan; only a
//! failure to enumerate the set is an error.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use crate::{
    agent::AgentId,
    codec,
    document::DocumentId,
    error::Result,
    record::{LockRecord, LockState},
    staleness::{lock_age, StalenessPolicy},
    store::DocumentStore,
};

/// How a document is classified at scan time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LockClass {
    Available,
    /// Live lock
    Editing,
    /// Editing lock older than the threshold
    Stale,
    Review,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub id: DocumentId,
    pub class: LockClass,
    pub record: LockRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleLock {
    pub id: DocumentId,
    pub holder: AgentId,
    pub since: DateTime<Utc>,
    pub age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: DocumentId,
    pub reason: String,
}

/// Counts per class; `locked` only counts live locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub available: usize,
    pub locked: usize,
    pub stale: usize,
    pub review: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub scanned_at: Option<DateTime<Utc>>,
    pub entries: Vec<ScanEntry>,
    pub stale: Vec<StaleLock>,
    pub skipped: Vec<SkippedDocument>,
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Entries currently held by `agent`, stale or not.
    pub fn held_by<'a>(&'a self, agent: &'a AgentId) -> impl Iterator<Item = &'a ScanEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.record.locked_by() == Some(agent))
    }

    fn push(&mut self, entry: ScanEntry) {
        match entry.class {
            LockClass::Available => self.summary.available += 1,
            LockClass::Editing => self.summary.locked += 1,
            LockClass::Stale => self.summary.stale += 1,
            LockClass::Review => self.summary.review += 1,
        }
        self.summary.total += 1;
        self.entries.push(entry);
    }

    fn skip(&mut self, id: DocumentId, reason: String) {
        warn!(document = %id, reason = %reason, "skipping document");
        self.summary.skipped += 1;
        self.summary.total += 1;
        self.skipped.push(SkippedDocument { id, reason });
    }
}

/// Classify one record at `now`.
#[must_use]
pub fn classify(record: &LockRecord, now: DateTime<Utc>, policy: &StalenessPolicy) -> LockClass {
    match record.state {
        LockState::Available => LockClass::Available,
        LockState::Review => LockClass::Review,
        LockState::Editing(_) if policy.is_stale(record, now) => LockClass::Stale,
        LockState::Editing(_) => LockClass::Editing,
    }
}

/// Scan every document in `store` as of `now`.
///
/// # Errors
///
/// Returns `Error::Store` if the store cannot list its documents.
pub fn scan<S: DocumentStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
) -> Result<ScanReport> {
    let ids = store.list()?;
    let mut report = ScanReport {
        scanned_at: Some(now),
        ..ScanReport::default()
    };

    for id in ids {
        let raw = match store.read(&id) {
            Ok(raw) => raw,
            Err(e) => {
                report.skip(id, e.to_string());
                continue;
            }
        };
        let record = match codec::decode(&raw) {
            Ok((record, _)) => record,
            Err(e) => {
                report.skip(id, format!("malformed lock record: {e}"));
                continue;
            }
        };

        let class = classify(&record, now, policy);
        if class == LockClass::Stale {
            if let Some(holder) = record.holder() {
                report.stale.push(StaleLock {
                    id: id.clone(),
                    holder: holder.agent.clone(),
                    since: holder.since,
                    age: lock_age(&record, now).unwrap_or_else(Duration::zero),
                });
            }
        }
        report.push(ScanEntry { id, class, record });
    }

    debug!(
        total = report.summary.total,
        locked = report.summary.locked,
        stale = report.summary.stale,
        skipped = report.summary.skipped,
        "scan complete"
    );
    Ok(report)
}
