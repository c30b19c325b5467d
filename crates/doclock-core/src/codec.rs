//! Lock record codec
//!
//! A managed document starts with a YAML metadata block:
//!
//! ```text
//! ---
//! title: Weekly sync
//! locked_by: null
//! locked_at: null
//! status: available
//! last_edited_by: null
//! last_edited_at: null
//! edit_history: []
//! ---
//! # Weekly sync
//! ```
//!
//! `decode` splits the block from the body and validates the lock fields
//! against a strict schema. Keys that are not lock fields stay in
//! `LockRecord::extra`. `encode` writes the extra keys first, then the lock
//! fields in a fixed order, so `encode(decode(x)) == x` for any `x` that
//! `encode` produced. Pure: no I/O anywhere in this module.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::{
    agent::AgentId,
    events::{LockAction, LockEvent},
    ledger::HISTORY_LIMIT,
    record::{Holder, LockRecord, LockState, LockStatus},
};

const DELIMITER: &str = "---";

const BOM: char = '\u{feff}';

/// ISO-8601 local date-time without an offset; read as UTC.
const NAIVE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Keys owned by the lock record, in canonical order.
const LOCK_KEYS: [&str; 6] = [
    "locked_by",
    "locked_at",
    "status",
    "last_edited_by",
    "last_edited_at",
    "edit_history",
];

/// Why a lock block could not be decoded or encoded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("no metadata block at the head of the document")]
    MissingBlock,

    #[error("metadata block is not terminated by a '---' line")]
    UnterminatedBlock,

    #[error("metadata block is not a YAML mapping")]
    NotAMapping,

    #[error("metadata block has no 'status' field")]
    MissingStatus,

    #[error("invalid YAML in metadata block: {0}")]
    Yaml(String),

    #[error("invalid status '{0}' (expected available, editing or review)")]
    InvalidStatus(String),

    #[error("invalid action '{0}' (expected checkout, checkin or force-unlock)")]
    InvalidAction(String),

    #[error("invalid timestamp in '{field}': '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("invalid agent identity in '{field}': {reason}")]
    InvalidAgent { field: &'static str, reason: String },

    #[error("status is '{status}' but locked_by/locked_at are {detail}")]
    InconsistentLock { status: LockStatus, detail: &'static str },
}

// ═══════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    #[serde(default)]
    locked_by: Option<String>,
    #[serde(default)]
    locked_at: Option<String>,
    status: String,
    #[serde(default)]
    last_edited_by: Option<String>,
    #[serde(default)]
    last_edited_at: Option<String>,
    #[serde(default)]
    edit_history: Option<Vec<WireEvent>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEvent {
    agent: String,
    action: String,
    at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

/// Split `raw` into its lock record and body.
///
/// # Errors
///
/// Returns a `CodecError` when the block is missing or unterminated, is not
/// a mapping, or its lock fields violate the schema.
pub fn decode(raw: &str) -> Result<(LockRecord, String), CodecError> {
    let (block, body) = split_block(raw)?;
    let mapping = parse_mapping(block)?;
    let (lock, extra) = partition(mapping);

    if !lock.contains_key("status") {
        return Err(CodecError::MissingStatus);
    }

    let wire: WireRecord = serde_yaml::from_value(Value::Mapping(lock))
        .map_err(|e| CodecError::Yaml(e.to_string()))?;

    let mut record = from_wire(wire)?;
    record.extra = extra;
    Ok((record, body.to_string()))
}

/// Serialize `record` ahead of `body` in canonical form.
///
/// # Errors
///
/// Returns `CodecError::Yaml` if the extra metadata cannot be serialized.
pub fn encode(record: &LockRecord, body: &str) -> Result<String, CodecError> {
    let mut out = Mapping::new();
    for (key, value) in &record.extra {
        if !is_lock_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    let wire = serde_yaml::to_value(to_wire(record)).map_err(|e| CodecError::Yaml(e.to_string()))?;
    if let Value::Mapping(fields) = wire {
        out.extend(fields);
    }

    let yaml = serde_yaml::to_string(&Value::Mapping(out))
        .map_err(|e| CodecError::Yaml(e.to_string()))?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
}

/// Give `raw` a fresh, available lock record.
///
/// Content without a metadata block gets a new block in front of it; a
/// block without a `status` field gets the lock fields added after its
/// existing keys. Returns `Ok(None)` when the document already carries a
/// lock record.
///
/// # Errors
///
/// Returns a `CodecError` if an existing block is unterminated, not a
/// mapping, or carries an invalid lock record.
pub fn embed_new(raw: &str) -> Result<Option<String>, CodecError> {
    match decode(raw) {
        Ok(_) => Ok(None),
        Err(CodecError::MissingBlock) => encode(&LockRecord::available(), raw).map(Some),
        Err(CodecError::MissingStatus) => {
            let (block, body) = split_block(raw)?;
            let record = LockRecord {
                extra: parse_mapping(block)?,
                ..LockRecord::available()
            };
            encode(&record, body).map(Some)
        }
        Err(e) => Err(e),
    }
}

/// Canonical text form of a timestamp: RFC 3339, UTC, `Z` suffix, and only
/// as many fractional digits as the value needs.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn split_block(raw: &str) -> Result<(&str, &str), CodecError> {
    let raw = raw.strip_prefix(BOM).unwrap_or(raw);
    let rest = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
        .ok_or(CodecError::MissingBlock)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(|c| c == '\n' || c == '\r') == DELIMITER {
            return Ok((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(CodecError::UnterminatedBlock)
}

fn parse_mapping(block: &str) -> Result<Mapping, CodecError> {
    match serde_yaml::from_str::<Value>(block).map_err(|e| CodecError::Yaml(e.to_string()))? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(CodecError::NotAMapping),
    }
}

fn is_lock_key(key: &Value) -> bool {
    key.as_str().is_some_and(|k| LOCK_KEYS.contains(&k))
}

fn partition(mapping: Mapping) -> (Mapping, Mapping) {
    mapping
        .into_iter()
        .partition(|(key, _)| is_lock_key(key))
}

fn from_wire(wire: WireRecord) -> Result<LockRecord, CodecError> {
    let status = LockStatus::from_str(&wire.status)
        .map_err(|_| CodecError::InvalidStatus(wire.status.clone()))?;

    let locked_by = wire
        .locked_by
        .map(|a| parse_agent("locked_by", a))
        .transpose()?;
    let locked_at = wire
        .locked_at
        .map(|t| parse_timestamp("locked_at", &t))
        .transpose()?;

    let state = match (status, locked_by, locked_at) {
        (LockStatus::Editing, Some(agent), Some(since)) => {
            LockState::Editing(Holder::new(agent, since))
        }
        (LockStatus::Editing, _, _) => {
            return Err(CodecError::InconsistentLock {
                status,
                detail: "not both set",
            })
        }
        (LockStatus::Available, None, None) => LockState::Available,
        (LockStatus::Review, None, None) => LockState::Review,
        (LockStatus::Available | LockStatus::Review, _, _) => {
            return Err(CodecError::InconsistentLock {
                status,
                detail: "set",
            })
        }
    };

    // Oversized histories from other writers keep their newest entries.
    let mut history = wire.edit_history.unwrap_or_default();
    history.truncate(HISTORY_LIMIT);

    Ok(LockRecord {
        state,
        last_edited_by: wire
            .last_edited_by
            .map(|a| parse_agent("last_edited_by", a))
            .transpose()?,
        last_edited_at: wire
            .last_edited_at
            .map(|t| parse_timestamp("last_edited_at", &t))
            .transpose()?,
        history: history
            .into_iter()
            .map(event_from_wire)
            .collect::<Result<_, _>>()?,
        extra: Mapping::new(),
    })
}

fn event_from_wire(wire: WireEvent) -> Result<LockEvent, CodecError> {
    let action = LockAction::from_str(&wire.action)
        .map_err(|_| CodecError::InvalidAction(wire.action.clone()))?;

    Ok(LockEvent {
        agent: parse_agent("edit_history.agent", wire.agent)?,
        action,
        at: parse_timestamp("edit_history.at", &wire.at)?,
        previous_holder: wire
            .previous_holder
            .map(|a| parse_agent("edit_history.previous_holder", a))
            .transpose()?,
        reason: wire.reason,
    })
}

fn to_wire(record: &LockRecord) -> WireRecord {
    WireRecord {
        locked_by: record.locked_by().map(ToString::to_string),
        locked_at: record.locked_at().map(format_timestamp),
        status: record.status().to_string(),
        last_edited_by: record.last_edited_by.as_ref().map(ToString::to_string),
        last_edited_at: record.last_edited_at.map(format_timestamp),
        edit_history: Some(
            record
                .history
                .iter()
                .map(|event| WireEvent {
                    agent: event.agent.to_string(),
                    action: event.action.to_string(),
                    at: format_timestamp(event.at),
                    previous_holder: event.previous_holder.as_ref().map(ToString::to_string),
                    reason: event.reason.clone(),
                })
                .collect(),
        ),
    }
}

fn parse_agent(field: &'static str, value: String) -> Result<AgentId, CodecError> {
    AgentId::new(value).map_err(|e| CodecError::InvalidAgent {
        field,
        reason: e.to_string(),
    })
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, CodecError> {
    let trimmed = value.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, NAIVE_TIMESTAMP).map(|t| t.and_utc()))
        .map_err(|_| CodecError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}
