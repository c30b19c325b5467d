//! Configuration loading and management
//!
//! # Configuration Hierarchy
//!
//! Settings are resolved in order, later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. Global config: `~/.config/doclock/config.toml` (platform config dir)
//! 3. Project config: `.doclock/config.toml` under the managed root
//! 4. Environment variables: `DOCLOCK_*`
//! 5. CLI flags (applied by the front end)
//!
//! Config files are parsed into [`PartialConfig`], so a file only overrides
//! the keys it actually names.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    staleness::{StalenessPolicy, DEFAULT_STALE_AFTER_SECS},
    state_machine::{CheckinPolicy, Rules},
    store::STATE_DIR,
};

/// Largest config file that will be parsed
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the managed documents; the working directory when unset
    pub root: Option<PathBuf>,
    /// File extensions that make up the managed set
    pub extensions: Vec<String>,
    pub stale_after_secs: u64,
    pub checkin_policy: CheckinPolicy,
    pub agent_id: Option<String>,
    pub hooks: HooksConfig,
}

/// Shell commands run around lock operations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HooksConfig {
    pub pre_checkout: Vec<String>,
    pub post_checkout: Vec<String>,
    pub pre_checkin: Vec<String>,
    pub post_checkin: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            extensions: vec!["md".to_string()],
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            checkin_policy: CheckinPolicy::default(),
            agent_id: None,
            hooks: HooksConfig::default(),
        }
    }
}

/// Config file contents; only keys present in the file are `Some`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
    #[serde(default)]
    pub checkin_policy: Option<CheckinPolicy>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub hooks: Option<PartialHooksConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PartialHooksConfig {
    #[serde(default)]
    pub pre_checkout: Option<Vec<String>>,
    #[serde(default)]
    pub post_checkout: Option<Vec<String>>,
    #[serde(default)]
    pub pre_checkin: Option<Vec<String>>,
    #[serde(default)]
    pub post_checkin: Option<Vec<String>>,
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration for a project rooted at `project_dir`.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if a config file is malformed, too large,
/// a symlink, names an unknown key, or the merged values fail validation.
pub fn load_config(project_dir: &Path) -> Result<Config> {
    let global = global_config_path();
    let project = project_config_path(project_dir);
    let mut config = load_config_from(global.as_deref(), Some(&project))?;
    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// Merge defaults with the given files, skipping any that do not exist.
///
/// Environment overrides are not applied.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if an existing file cannot be loaded.
pub fn load_config_from(global: Option<&Path>, project: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();
    for path in [global, project].into_iter().flatten() {
        if let Some(partial) = load_partial_toml_file(path)? {
            tracing::debug!(path = %path.display(), "loaded config file");
            config.merge_partial(partial);
        }
    }
    Ok(config)
}

/// `.doclock/config.toml` under `project_dir`
#[must_use]
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join("config.toml")
}

fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "doclock")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Parse one config file. `Ok(None)` when it does not exist.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if the file is a symlink, exceeds the size
/// limit, is not valid TOML, or names an unknown key.
pub fn load_partial_toml_file(path: &Path) -> Result<Option<PartialConfig>> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::InvalidConfig(format!(
                "Failed to read config file metadata {}: {e}",
                path.display()
            )))
        }
    };

    if metadata.file_type().is_symlink() {
        return Err(Error::InvalidConfig(format!(
            "Config file {} is a symbolic link - refusing to follow",
            path.display()
        )));
    }

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(Error::InvalidConfig(format!(
            "Config file {} exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse config file {}: {e}", path.display())))
}

// ═══════════════════════════════════════════════════════════════════════════
// MERGE AND OVERRIDES
// ═══════════════════════════════════════════════════════════════════════════

impl Config {
    /// Merge a partial config using explicit-key semantics.
    ///
    /// Lists are replaced, not appended.
    pub fn merge_partial(&mut self, partial: PartialConfig) {
        if let Some(root) = partial.root {
            self.root = Some(root);
        }
        if let Some(extensions) = partial.extensions {
            self.extensions = extensions;
        }
        if let Some(secs) = partial.stale_after_secs {
            self.stale_after_secs = secs;
        }
        if let Some(policy) = partial.checkin_policy {
            self.checkin_policy = policy;
        }
        if let Some(agent_id) = partial.agent_id {
            self.agent_id = Some(agent_id);
        }
        if let Some(hooks) = partial.hooks {
            self.hooks.merge_partial(hooks);
        }
    }

    /// Apply `DOCLOCK_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a variable holds an invalid value.
    pub fn apply_env_vars(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a variable holds an invalid value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("DOCLOCK_ROOT") {
            self.root = Some(PathBuf::from(value));
        }

        if let Some(value) = lookup("DOCLOCK_AGENT_ID") {
            self.agent_id = Some(value);
        }

        if let Some(value) = lookup("DOCLOCK_STALE_AFTER_SECS") {
            self.stale_after_secs = value.trim().parse().map_err(|e| {
                Error::InvalidConfig(format!("Invalid DOCLOCK_STALE_AFTER_SECS value '{value}': {e}"))
            })?;
        }

        if let Some(value) = lookup("DOCLOCK_CHECKIN_POLICY") {
            self.checkin_policy = value.parse()?;
        }

        if let Some(value) = lookup("DOCLOCK_EXTENSIONS") {
            self.extensions = value
                .split(',')
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Check merged values.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for a zero staleness threshold, an
    /// empty extension list, or a blank agent id.
    pub fn validate(&self) -> Result<()> {
        if self.stale_after_secs == 0 {
            return Err(Error::InvalidConfig(
                "stale_after_secs must be greater than 0".to_string(),
            ));
        }

        if self.extensions.is_empty() {
            return Err(Error::InvalidConfig(
                "extensions must name at least one file extension".to_string(),
            ));
        }

        if let Some(bad) = self
            .extensions
            .iter()
            .find(|ext| ext.trim_start_matches('.').is_empty() || ext.contains(['/', '\\']))
        {
            return Err(Error::InvalidConfig(format!("Invalid extension: '{bad}'")));
        }

        if self.agent_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::InvalidConfig("agent_id must not be blank".to_string()));
        }

        Ok(())
    }

    #[must_use]
    pub fn staleness(&self) -> StalenessPolicy {
        StalenessPolicy::from_secs(self.stale_after_secs)
    }

    /// Rules the coordinator enforces under this config
    #[must_use]
    pub fn rules(&self) -> Rules {
        Rules {
            staleness: self.staleness(),
            checkin: self.checkin_policy,
        }
    }
}

impl HooksConfig {
    fn merge_partial(&mut self, partial: PartialHooksConfig) {
        if let Some(cmds) = partial.pre_checkout {
            self.pre_checkout = cmds;
        }
        if let Some(cmds) = partial.post_checkout {
            self.post_checkout = cmds;
        }
        if let Some(cmds) = partial.pre_checkin {
            self.pre_checkin = cmds;
        }
        if let Some(cmds) = partial.post_checkin {
            self.post_checkin = cmds;
        }
    }
}
