//! Command implementations
//!
//! Each command takes a loaded [`Context`] plus its own options and prints
//! either human-readable text or JSON.

pub mod checkin;
pub mod checkout;
pub mod force_unlock;
pub mod init;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use doclock_core::{load_config, AgentId, Config, Coordinator, DocumentId, FsStore};
use serde_json::Value;

use crate::identity::resolve_agent;

/// Settings taken from global CLI flags
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub root: Option<PathBuf>,
    pub agent: Option<String>,
    pub json: bool,
    pub stale_after: Option<u64>,
}

/// Everything a command needs: merged config, coordinator, caller identity
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub coordinator: Coordinator<FsStore>,
    pub agent: AgentId,
    pub json: bool,
    cwd: PathBuf,
}

impl Context {
    /// Load configuration and build the coordinator for the managed root.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable, the config
    /// is invalid, or no valid agent identity can be resolved.
    pub fn load(options: &GlobalOptions) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let base = options
            .root
            .clone()
            .or_else(|| std::env::var_os("DOCLOCK_ROOT").map(PathBuf::from))
            .map_or_else(|| cwd.clone(), |dir| cwd.join(dir));

        let mut config = load_config(&base)?;
        if let Some(secs) = options.stale_after {
            config.stale_after_secs = secs;
        }
        config.validate()?;

        let root = match (&options.root, &config.root) {
            (Some(dir), _) | (None, Some(dir)) => cwd.join(dir),
            (None, None) => base,
        };
        if !root.is_dir() {
            anyhow::bail!("Managed root '{}' is not a directory", root.display());
        }

        let agent = resolve_agent(options.agent.as_deref(), &config)?;
        tracing::debug!(root = %root.display(), agent = %agent, "context loaded");

        let store = FsStore::new(root, &config.extensions);
        let coordinator = Coordinator::new(store, config.rules());

        Ok(Self {
            config,
            coordinator,
            agent,
            json: options.json,
            cwd,
        })
    }

    /// Map a path given on the command line to a document identifier.
    ///
    /// Relative paths are taken relative to the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is outside the managed root or not a
    /// managed document.
    pub fn document(&self, path: &Path) -> Result<DocumentId> {
        let path = self.cwd.join(path);
        self.coordinator
            .store()
            .document_id(&path)
            .map_err(|e| doclock_core::Error::from(e).into())
    }
}

pub(crate) fn print_json(value: &Value) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_resolves_relative_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let ctx = Context {
            config: Config::default(),
            coordinator: Coordinator::new(
                FsStore::new(dir.path(), &Config::default().extensions),
                Config::default().rules(),
            ),
            agent: AgentId::new("a1").unwrap(),
            json: false,
            cwd: dir.path().join("docs"),
        };

        let id = ctx.document(Path::new("plan.md")).unwrap();
        assert_eq!(id.as_str(), "docs/plan.md");
        assert!(ctx.document(Path::new("../../elsewhere.md")).is_err());
    }
}
