//! Checkout command - take the editing lock on a document

use std::path::PathBuf;

use anyhow::Result;
use doclock_core::{codec::format_timestamp, AgentId};
use serde_json::json;

use super::{print_json, Context};
use crate::hooks::{run_stage, Stage};

#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub path: PathBuf,
}

/// Run the checkout command
///
/// # Errors
///
/// Returns an error if:
/// - The path is not a managed document
/// - A `pre_checkout` hook fails
/// - Another agent holds a live lock
/// - The lock record is malformed or the file cannot be read or written
pub fn run(ctx: &Context, options: &CheckoutOptions) -> Result<()> {
    let doc = ctx.document(&options.path)?;

    run_stage(Stage::PreCheckout, &ctx.config.hooks.pre_checkout, &doc, &ctx.agent)?;
    let result = ctx.coordinator.checkout(&doc, &ctx.agent)?;
    let hooks = run_stage(Stage::PostCheckout, &ctx.config.hooks.post_checkout, &doc, &ctx.agent)?;

    if ctx.json {
        return print_json(&json!({
            "success": true,
            "command": "checkout",
            "document": doc.as_str(),
            "agent": ctx.agent.as_str(),
            "granted": result.granted,
            "reclaimed_stale": result.reclaimed_stale,
            "previous_holder": result.previous_holder.as_ref().map(AgentId::as_str),
            "refreshed": result.refreshed,
            "locked_at": format_timestamp(result.locked_at),
            "hooks": hooks,
        }));
    }

    if let Some(prev) = &result.previous_holder {
        println!("✓ Checked out '{doc}' as {} (reclaimed stale lock from {prev})", ctx.agent);
    } else if result.refreshed {
        println!("✓ Refreshed lock on '{doc}' as {}", ctx.agent);
    } else {
        println!("✓ Checked out '{doc}' as {}", ctx.agent);
    }
    println!("  Locked at: {}", format_timestamp(result.locked_at));
    Ok(())
}
