//! Stale lock detection
//!
//! Pure functions of the record, the caller-supplied `now` and the
//! threshold. Nothing here reads the clock.

use chrono::{DateTime, Duration, Utc};

use crate::record::LockRecord;

/// Default staleness threshold in seconds (1 hour).
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;

/// Decides when an editing lock has been abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    threshold: Duration,
}

impl StalenessPolicy {
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Build a policy from a threshold in whole seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::new(
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        )
    }

    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    /// See [`is_stale`].
    #[must_use]
    pub fn is_stale(&self, record: &LockRecord, now: DateTime<Utc>) -> bool {
        is_stale(record, now, self.threshold)
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_STALE_AFTER_SECS)
    }
}

/// True iff the record is `Editing` and `now - locked_at > threshold`.
#[must_use]
pub fn is_stale(record: &LockRecord, now: DateTime<Utc>, threshold: Duration) -> bool {
    lock_age(record, now).is_some_and(|age| age > threshold)
}

/// How long the current lock has been held, if there is one.
///
/// Negative when `locked_at` lies in the future (clock skew between agents).
#[must_use]
pub fn lock_age(record: &LockRecord, now: DateTime<Utc>) -> Option<Duration> {
    record.locked_at().map(|since| now - since)
}

/// Short human form of a duration: `45s`, `30m`, `1h 30m`, `2d 3h`.
#[must_use]
pub fn format_age(age: &Duration) -> String {
    let secs = age.num_seconds().max(0);
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, 0) => format!("{h}h"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, 0, _) => format!("{d}d"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}
