//! Force-unlock command - break a lock with a recorded reason

use std::path::PathBuf;

use anyhow::Result;
use doclock_core::AgentId;
use serde_json::json;

use super::{print_json, Context};

#[derive(Debug, Clone)]
pub struct ForceUnlockOptions {
    pub path: PathBuf,
    pub reason: String,
}

/// Run the force-unlock command
///
/// # Errors
///
/// Returns an error if the path is not a managed document, the reason is
/// blank, or the document cannot be read, decoded or written.
pub fn run(ctx: &Context, options: &ForceUnlockOptions) -> Result<()> {
    let doc = ctx.document(&options.path)?;
    let result = ctx
        .coordinator
        .force_unlock(&doc, &ctx.agent, &options.reason)?;

    if ctx.json {
        return print_json(&json!({
            "success": true,
            "command": "force-unlock",
            "document": doc.as_str(),
            "agent": ctx.agent.as_str(),
            "previous_holder": result.previous_holder.as_ref().map(AgentId::as_str),
            "reason": options.reason.trim(),
        }));
    }

    match &result.previous_holder {
        Some(holder) => println!("✓ Force-unlocked '{doc}' (was held by {holder})"),
        None => println!("✓ Force-unlocked '{doc}' (it was not locked)"),
    }
    println!("  Reason: {}", options.reason.trim());
    Ok(())
}
