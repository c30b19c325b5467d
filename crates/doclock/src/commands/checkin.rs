//! Checkin command - release the editing lock on a document

use std::path::PathBuf;

use anyhow::Result;
use doclock_core::{staleness::format_age, AgentId, LockStatus};
use serde_json::json;

use super::{print_json, Context};
use crate::hooks::{run_stage, Stage};

#[derive(Debug, Clone)]
pub struct CheckinOptions {
    pub path: PathBuf,
    /// Leave the document in review instead of available
    pub review: bool,
}

/// Run the checkin command
///
/// Checking in a document that is not locked only prints a warning.
///
/// # Errors
///
/// Returns an error if:
/// - The path is not a managed document
/// - A `pre_checkin` hook fails
/// - The caller is not the holder under the holder-only policy
/// - The lock record is malformed or the file cannot be read or written
pub fn run(ctx: &Context, options: &CheckinOptions) -> Result<()> {
    let doc = ctx.document(&options.path)?;

    run_stage(Stage::PreCheckin, &ctx.config.hooks.pre_checkin, &doc, &ctx.agent)?;
    let result = if options.review {
        ctx.coordinator.checkin_for_review(&doc, &ctx.agent)?
    } else {
        ctx.coordinator.checkin(&doc, &ctx.agent)?
    };
    let hooks = if result.was_locked {
        run_stage(Stage::PostCheckin, &ctx.config.hooks.post_checkin, &doc, &ctx.agent)?
    } else {
        Vec::new()
    };

    if ctx.json {
        return print_json(&json!({
            "success": true,
            "command": "checkin",
            "document": doc.as_str(),
            "agent": ctx.agent.as_str(),
            "was_locked": result.was_locked,
            "held_secs": result.held_duration.map(|d| d.num_seconds()),
            "previous_holder": result.previous_holder.as_ref().map(AgentId::as_str),
            "status": result.status.to_string(),
            "hooks": hooks,
        }));
    }

    if !result.was_locked {
        println!("'{doc}' was not locked (status: {}); nothing to check in", result.status);
        return Ok(());
    }

    let held = result
        .held_duration
        .map_or_else(|| "unknown".to_string(), |d| format_age(&d));
    match &result.previous_holder {
        Some(holder) if *holder != ctx.agent => {
            println!("✓ Checked in '{doc}' (lock held by {holder} for {held})");
        }
        _ => println!("✓ Checked in '{doc}' (held for {held})"),
    }
    if result.status == LockStatus::Review {
        println!("  Status: review");
    }
    Ok(())
}
