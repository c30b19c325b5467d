//! Agent identity resolution
//!
//! Order: `--agent`, then `agent_id` from config (which already carries
//! `DOCLOCK_AGENT_ID`), then `<hostname>-<random hex>`. A generated id is
//! different on every invocation, so agents that check out and later check
//! in should pin one.

use anyhow::{Context, Result};
use doclock_core::{AgentId, Config};

/// Pick the identity recorded for this invocation.
///
/// # Errors
///
/// Returns an error if the chosen id is invalid.
pub fn resolve_agent(flag: Option<&str>, config: &Config) -> Result<AgentId> {
    if let Some(id) = flag.or(config.agent_id.as_deref()) {
        return AgentId::new(id).context("Invalid agent id");
    }

    let generated = generated_id();
    tracing::warn!(agent = %generated, "no agent id configured; using a generated one");
    AgentId::new(generated).context("Invalid generated agent id")
}

fn generated_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "agent".to_string());
    format!("{}-{:08x}", host.trim(), rand::random::<u32>())
}
