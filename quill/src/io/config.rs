//! Quill configuration stored under `.quill/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config location relative to the workspace root.
pub const CONFIG_RELATIVE_PATH: &str = ".quill/config.toml";

/// Quill configuration (TOML).
///
/// Missing fields default to sensible values; a missing file is the default
/// config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct QuillConfig {
    pub workspace: WorkspaceConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Permit paths that resolve outside the workspace root.
    pub allow_outside_workspace: bool,

    /// Undo stack bound; the oldest entry is evicted beyond this.
    pub max_undo_entries: usize,

    /// Compute a line diff when edits or overwrites replace existing content.
    pub diff_preview: bool,

    /// Workspace-relative file with extra ignore patterns for `list`.
    pub ignore_file: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            allow_outside_workspace: false,
            max_undo_entries: 100,
            diff_preview: true,
            ignore_file: ".quillignore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Command that receives a prompt on stdin and answers on stdout
    /// (e.g. `["llm", "-m", "gpt-4o"]`). Empty disables `plan`/`execute`.
    pub command: Vec<String>,

    /// Wall-clock budget per agent invocation.
    pub timeout_secs: u64,

    /// Truncate agent stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 5 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.command
            .first()
            .is_some_and(|program| !program.trim().is_empty())
    }
}

impl QuillConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workspace.max_undo_entries == 0 {
            return Err(anyhow!("workspace.max_undo_entries must be > 0"));
        }
        if self.workspace.ignore_file.trim().is_empty() {
            return Err(anyhow!("workspace.ignore_file must not be empty"));
        }
        if self.agent.timeout_secs == 0 {
            return Err(anyhow!("agent.timeout_secs must be > 0"));
        }
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        if !self.agent.command.is_empty() && !self.agent.is_configured() {
            return Err(anyhow!("agent.command must start with a program name"));
        }
        Ok(())
    }
}

/// Default config path for a workspace root.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_RELATIVE_PATH)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `QuillConfig::default()`.
pub fn load_config(path: &Path) -> Result<QuillConfig> {
    if !path.exists() {
        let cfg = QuillConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: QuillConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
