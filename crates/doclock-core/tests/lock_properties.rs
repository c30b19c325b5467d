//! Property-based tests for the lock record codec and state machine
//!
//! Properties:
//! - `decode(encode(r)) == r` for every valid record
//! - encoding a decoded canonical document is byte-stable
//! - every editing record has both a holder and a lock time
//! - history never exceeds `HISTORY_LIMIT`, whatever the operation sequence
//! - a rejected operation leaves the stored document untouched

use chrono::{DateTime, Duration, TimeZone, Utc};
use doclock_core::{
    codec, AgentId, Coordinator, DocumentId, Holder, LockAction, LockEvent, LockRecord, LockState,
    LockStatus, ManualClock, MemoryStore, Rules, HISTORY_LIMIT,
};
use proptest::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════
// STRATEGIES
// ═══════════════════════════════════════════════════════════════════════════

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn agent_strategy() -> impl Strategy<Value = AgentId> {
    "[a-z][a-z0-9_-]{0,11}".prop_map(|s| AgentId::new(s).unwrap())
}

fn time_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..10_000_000, prop_oneof![Just(0u32), 1u32..1_000_000_000])
        .prop_map(|(secs, nanos)| base() + Duration::seconds(secs) + Duration::nanoseconds(i64::from(nanos)))
}

fn action_strategy() -> impl Strategy<Value = LockAction> {
    prop_oneof![
        Just(LockAction::Checkout),
        Just(LockAction::Checkin),
        Just(LockAction::ForceUnlock),
    ]
}

fn event_strategy() -> impl Strategy<Value = LockEvent> {
    (
        agent_strategy(),
        action_strategy(),
        time_strategy(),
        proptest::option::of(agent_strategy()),
        proptest::option::of("[a-zA-Z][a-zA-Z0-9 ]{0,20}[a-zA-Z0-9]"),
    )
        .prop_map(|(agent, action, at, previous_holder, reason)| LockEvent {
            agent,
            action,
            at,
            previous_holder,
            reason,
        })
}

fn state_strategy() -> impl Strategy<Value = LockState> {
    prop_oneof![
        Just(LockState::Available),
        Just(LockState::Review),
        (agent_strategy(), time_strategy())
            .prop_map(|(agent, since)| LockState::Editing(Holder::new(agent, since))),
    ]
}

fn record_strategy() -> impl Strategy<Value = LockRecord> {
    (
        state_strategy(),
        proptest::option::of(agent_strategy()),
        proptest::option::of(time_strategy()),
        proptest::collection::vec(event_strategy(), 0..=HISTORY_LIMIT),
    )
        .prop_map(|(state, last_edited_by, last_edited_at, history)| LockRecord {
            state,
            last_edited_by,
            last_edited_at,
            history,
            ..LockRecord::default()
        })
}

#[derive(Debug, Clone)]
enum Op {
    Checkout(usize),
    Checkin(usize, bool),
    ForceUnlock(usize, bool),
}

fn op_strategy() -> impl Strategy<Value = (Op, i64)> {
    let op = prop_oneof![
        (0usize..3).prop_map(Op::Checkout),
        (0usize..3, any::<bool>()).prop_map(|(a, r)| Op::Checkin(a, r)),
        (0usize..3, any::<bool>()).prop_map(|(a, r)| Op::ForceUnlock(a, r)),
    ];
    (op, 0i64..180)
}

const AGENTS: [&str; 3] = ["a1", "a2", "a3"];

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_codec_round_trip(record in record_strategy(), body in "[ -~\n]{0,80}") {
        let encoded = codec::encode(&record, &body).unwrap();
        let (decoded, decoded_body) = codec::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, record);
        prop_assert_eq!(decoded_body, body);
    }

    #[test]
    fn prop_encoding_is_byte_stable(record in record_strategy()) {
        let first = codec::encode(&record, "# body\n").unwrap();
        let (decoded, body) = codec::decode(&first).unwrap();
        let second = codec::encode(&decoded, &body).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_operation_sequences_keep_invariants(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let store = MemoryStore::with_documents([("doc.md", "---\nstatus: available\n---\nbody\n")]).unwrap();
        let clock = ManualClock::new(base());
        let c = Coordinator::with_clock(&store, &clock, Rules::default());
        let id = DocumentId::parse("doc.md").unwrap();

        for (op, minutes) in ops {
            clock.advance(Duration::minutes(minutes));
            let before = store.snapshot(&id);
            let history_before = c.status(&id).unwrap().history.len();

            let result = match op {
                Op::Checkout(a) => c.checkout(&id, &AgentId::new(AGENTS[a]).unwrap()).map(|_| true),
                Op::Checkin(a, review) => {
                    let agent = AgentId::new(AGENTS[a]).unwrap();
                    let r = if review {
                        c.checkin_for_review(&id, &agent)
                    } else {
                        c.checkin(&id, &agent)
                    };
                    r.map(|r| r.was_locked)
                }
                Op::ForceUnlock(a, with_reason) => {
                    let reason = if with_reason { "reset" } else { " " };
                    c.force_unlock(&id, &AgentId::new(AGENTS[a]).unwrap(), reason).map(|_| true)
                }
            };

            let raw = store.snapshot(&id).unwrap();
            let (record, body) = codec::decode(&raw).unwrap();
            prop_assert_eq!(body, "body\n");
            prop_assert!(record.history.len() <= HISTORY_LIMIT);

            match record.status() {
                LockStatus::Editing => {
                    prop_assert!(record.locked_by().is_some());
                    prop_assert!(record.locked_at().is_some());
                }
                LockStatus::Available | LockStatus::Review => {
                    prop_assert!(record.locked_by().is_none());
                    prop_assert!(record.locked_at().is_none());
                }
            }

            match result {
                Ok(true) => {
                    prop_assert_eq!(record.history.len(), (history_before + 1).min(HISTORY_LIMIT));
                    prop_assert_eq!(record.history[0].at, clock_now(&clock));
                }
                Ok(false) | Err(_) => prop_assert_eq!(Some(raw), before),
            }
        }
    }

    #[test]
    fn prop_staleness_boundary(minutes in 0i64..240) {
        let holder = AgentId::new("a1").unwrap();
        let record = LockRecord {
            state: LockState::Editing(Holder::new(holder, base())),
            ..LockRecord::default()
        };
        let now = base() + Duration::minutes(minutes);
        let stale = doclock_core::staleness::is_stale(&record, now, Duration::hours(1));
        prop_assert_eq!(stale, minutes > 60);
    }
}

fn clock_now(clock: &ManualClock) -> DateTime<Utc> {
    use doclock_core::Clock;
    clock.now()
}
