//! Init command - embed a lock record into a document

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use super::{print_json, Context};

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub path: PathBuf,
}

/// Run the init command
///
/// # Errors
///
/// Returns an error if the path is not a managed document, an existing
/// metadata block is invalid, or the file cannot be read or written.
pub fn run(ctx: &Context, options: &InitOptions) -> Result<()> {
    let doc = ctx.document(&options.path)?;
    let result = ctx.coordinator.init(&doc, &ctx.agent)?;

    if ctx.json {
        return print_json(&json!({
            "success": true,
            "command": "init",
            "document": doc.as_str(),
            "created": result.created,
        }));
    }

    if result.created {
        println!("✓ Added lock record to '{doc}'");
    } else {
        println!("'{doc}' already has a lock record");
    }
    Ok(())
}
