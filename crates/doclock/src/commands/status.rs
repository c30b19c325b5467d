//! Status command - one document's lock, or a scan of the whole root

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use doclock_core::{
    codec::format_timestamp,
    scan::classify,
    staleness::{format_age, lock_age},
    AgentId, Clock, DocumentId, LockClass, LockEvent, LockRecord, ScanReport, StaleLock,
};
use serde_json::{json, Value};

use super::{print_json, Context};

/// History entries shown in human-readable output
const HISTORY_SHOWN: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Document to inspect; every managed document when absent
    pub path: Option<PathBuf>,
}

/// Run the status command
///
/// # Errors
///
/// Returns an error if the document cannot be read or decoded, or the
/// managed root cannot be listed. Malformed documents found by a scan are
/// reported, not treated as errors.
pub fn run(ctx: &Context, options: &StatusOptions) -> Result<()> {
    match &options.path {
        Some(path) => show_document(ctx, &ctx.document(path)?),
        None => show_scan(ctx, &ctx.coordinator.scan()?),
    }
}

fn show_document(ctx: &Context, doc: &DocumentId) -> Result<()> {
    let record = ctx.coordinator.status(doc)?;
    let now = ctx.coordinator.clock().now();
    let class = classify(&record, now, &ctx.coordinator.rules().staleness);

    if ctx.json {
        return print_json(&record_json(doc, &record, class, now));
    }

    println!("{doc}: {class}");
    if let Some(holder) = record.holder() {
        let age = lock_age(&record, now).map_or_else(String::new, |a| format!(" ({} ago)", format_age(&a)));
        println!("  Locked by: {}", holder.agent);
        println!("  Since:     {}{age}", format_timestamp(holder.since));
        if class == LockClass::Stale {
            println!(
                "  Stale:     yes (threshold {}); any agent may check it out",
                format_age(&ctx.coordinator.rules().staleness.threshold())
            );
        }
    }
    if let (Some(by), Some(at)) = (&record.last_edited_by, record.last_edited_at) {
        println!("  Last edit: {by} at {}", format_timestamp(at));
    }
    if !record.history.is_empty() {
        println!("  History:");
        for event in record.history.iter().take(HISTORY_SHOWN) {
            println!("    {}", describe_event(event));
        }
        if record.history.len() > HISTORY_SHOWN {
            println!("    ... {} more", record.history.len() - HISTORY_SHOWN);
        }
    }
    Ok(())
}

fn show_scan(ctx: &Context, report: &ScanReport) -> Result<()> {
    let now = report.scanned_at.unwrap_or_else(|| ctx.coordinator.clock().now());

    if ctx.json {
        let documents: Vec<Value> = report
            .entries
            .iter()
            .map(|e| record_json(&e.id, &e.record, e.class, now))
            .collect();
        let stale: Vec<Value> = report.stale.iter().map(stale_json).collect();
        let skipped: Vec<Value> = report
            .skipped
            .iter()
            .map(|s| json!({ "document": s.id.as_str(), "reason": s.reason }))
            .collect();
        return print_json(&json!({
            "success": true,
            "command": "status",
            "scanned_at": format_timestamp(now),
            "documents": documents,
            "stale": stale,
            "skipped": skipped,
            "summary": report.summary,
        }));
    }

    if report.entries.is_empty() && report.skipped.is_empty() {
        println!("No managed documents found");
        return Ok(());
    }

    let width = report
        .entries
        .iter()
        .map(|e| e.id.as_str().len())
        .max()
        .unwrap_or(0)
        .max("DOCUMENT".len());
    println!("{:<width$}  {:<9}  {:<16}  AGE", "DOCUMENT", "STATUS", "HOLDER");
    for entry in &report.entries {
        let holder = entry.record.locked_by().map_or("-", AgentId::as_str);
        let age = lock_age(&entry.record, now).map_or_else(|| "-".to_string(), |a| format_age(&a));
        println!(
            "{:<width$}  {:<9}  {:<16}  {age}",
            entry.id.as_str(),
            entry.class.to_string(),
            holder
        );
    }

    let s = &report.summary;
    println!();
    println!(
        "{} documents: {} available, {} locked, {} stale, {} review, {} skipped",
        s.total, s.available, s.locked, s.stale, s.review, s.skipped
    );

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.id, skipped.reason);
        }
    }
    Ok(())
}

fn describe_event(event: &LockEvent) -> String {
    let mut line = format!("{} {} by {}", format_timestamp(event.at), event.action, event.agent);
    if let Some(prev) = &event.previous_holder {
        line.push_str(&format!(" (from {prev})"));
    }
    if let Some(reason) = &event.reason {
        line.push_str(&format!(": {reason}"));
    }
    line
}

fn stale_json(lock: &StaleLock) -> Value {
    json!({
        "document": lock.id.as_str(),
        "holder": lock.holder.as_str(),
        "since": format_timestamp(lock.since),
        "age_secs": lock.age.num_seconds(),
    })
}

fn record_json(doc: &DocumentId, record: &LockRecord, class: LockClass, now: DateTime<Utc>) -> Value {
    let history: Vec<Value> = record
        .history
        .iter()
        .map(|e| {
            json!({
                "agent": e.agent.as_str(),
                "action": e.action.to_string(),
                "at": format_timestamp(e.at),
                "previous_holder": e.previous_holder.as_ref().map(AgentId::as_str),
                "reason": e.reason,
            })
        })
        .collect();

    json!({
        "document": doc.as_str(),
        "status": record.status().to_string(),
        "class": class,
        "locked_by": record.locked_by().map(AgentId::as_str),
        "locked_at": record.locked_at().map(format_timestamp),
        "lock_age_secs": lock_age(record, now).map(|a| a.num_seconds()),
        "last_edited_by": record.last_edited_by.as_ref().map(AgentId::as_str),
        "last_edited_at": record.last_edited_at.map(format_timestamp),
        "edit_history": history,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use doclock_core::LockAction;

    use super::*;

    #[test]
    fn test_describe_force_unlock_event() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
        let event = LockEvent::new(AgentId::new("ops").unwrap(), LockAction::ForceUnlock, at)
            .with_previous_holder(Some(AgentId::new("a1").unwrap()))
            .with_reason("crashed");
        assert_eq!(
            describe_event(&event),
            "2026-05-04T10:00:00Z force-unlock by ops (from a1): crashed"
        );
    }

    #[test]
    fn test_stale_json_reports_holder_and_age() {
        let since = Utc.with_ymd_and_hms(2026, 5, 4, 7, 0, 0).unwrap();
        let lock = StaleLock {
            id: DocumentId::parse("plan.md").unwrap(),
            holder: AgentId::new("a1").unwrap(),
            since,
            age: chrono::Duration::hours(3),
        };
        let value = stale_json(&lock);
        assert_eq!(value["document"], "plan.md");
        assert_eq!(value["holder"], "a1");
        assert_eq!(value["since"], "2026-05-04T07:00:00Z");
        assert_eq!(value["age_secs"], 10_800);
    }

    #[test]
    fn test_record_json_for_available_document() {
        let doc = DocumentId::parse("a.md").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
        let value = record_json(&doc, &LockRecord::available(), LockClass::Available, now);
        assert_eq!(value["status"], "available");
        assert_eq!(value["class"], "available");
        assert!(value["locked_by"].is_null());
        assert_eq!(value["edit_history"], json!([]));
    }
}
