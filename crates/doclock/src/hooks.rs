//! Lock hooks - run shell commands around checkout and checkin
//!
//! Typical use is pulling before a checkout and pushing after a checkin.
//! A failing `pre_*` hook aborts the operation before the document is read;
//! a failing `post_*` hook is reported but the lock change stands.

use std::process::Command;

use anyhow::Result;
use doclock_core::{AgentId, DocumentId};
use serde::Serialize;

/// When a hook runs relative to the lock operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreCheckout,
    PostCheckout,
    PreCheckin,
    PostCheckin,
}

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreCheckout => "pre_checkout",
            Self::PostCheckout => "post_checkout",
            Self::PreCheckin => "pre_checkin",
            Self::PostCheckin => "post_checkin",
        }
    }

    const fn is_pre(self) -> bool {
        matches!(self, Self::PreCheckout | Self::PreCheckin)
    }
}

/// Result of running a hook
#[derive(Debug, Clone, Serialize)]
pub struct HookResult {
    pub hook: &'static str,
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run every command configured for `stage`, stopping at the first failure.
///
/// # Errors
///
/// Returns an error when a pre-operation hook fails.
pub fn run_stage(
    stage: Stage,
    commands: &[String],
    document: &DocumentId,
    agent: &AgentId,
) -> Result<Vec<HookResult>> {
    let mut results = Vec::with_capacity(commands.len());

    for command in commands {
        let result = run_hook_command(stage, command, document, agent);
        let failed = !result.success;
        if failed {
            tracing::warn!(
                hook = stage.name(),
                command = %command,
                error = result.error.as_deref().unwrap_or_default(),
                "hook failed"
            );
        } else {
            tracing::info!(hook = stage.name(), command = %command, "hook ran");
        }
        results.push(result);

        if failed {
            if stage.is_pre() {
                anyhow::bail!(
                    "{} hook '{command}' failed; '{document}' was not changed",
                    stage.name()
                );
            }
            break;
        }
    }

    Ok(results)
}

fn run_hook_command(
    stage: Stage,
    command: &str,
    document: &DocumentId,
    agent: &AgentId,
) -> HookResult {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    cmd.env("DOCLOCK_HOOK", stage.name())
        .env("DOCLOCK_DOCUMENT", document.as_str())
        .env("DOCLOCK_AGENT", agent.as_str());

    match cmd.output() {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let success = output.status.success();

            HookResult {
                hook: stage.name(),
                success,
                command: command.to_string(),
                output: (!stdout.is_empty()).then_some(stdout),
                error: (!success).then(|| {
                    if stderr.is_empty() {
                        format!(
                            "Hook exited with code: {}",
                            output.status.code().unwrap_or(-1)
                        )
                    } else {
                        stderr
                    }
                }),
            }
        }
        Err(e) => HookResult {
            hook: stage.name(),
            success: false,
            command: command.to_string(),
            output: None,
            error: Some(format!("Failed to execute hook: {e}")),
        },
    }
}
