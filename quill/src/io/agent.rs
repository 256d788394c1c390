//! Planner and step-interpreter seams, plus the command-backed agent.
//!
//! The [`Planner`] and [`StepInterpreter`] traits decouple plan execution from
//! the agent backend. [`CommandAgent`] pipes a rendered prompt into an external
//! command and decodes its stdout. Tests use scripted doubles from
//! `test_support` that return predetermined outputs without spawning processes.

use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{Edit, EditMode, MutationRequest, StepContext};
use crate::error::EngineError;
use crate::io::config::AgentConfig;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::PromptEngine;

const ACTIONS_SCHEMA: &str = include_str!("../../schemas/actions.schema.json");

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n(.*?)```").expect("valid fence regex"));
static STEP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:(?:step\s*)?\d+\s*[.):]|[-*+•])\s*").expect("valid step regex"));

/// Raw planner response plus the steps extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerOutput {
    pub steps: Vec<String>,
    pub raw: String,
}

/// Produces an ordered list of natural-language steps for a task.
pub trait Planner {
    fn plan(&self, task: &str, workspace_context: &str) -> Result<PlannerOutput>;
}

/// Turns one natural-language step into concrete mutation requests.
///
/// Errors that wrap an [`EngineError`] keep its kind when reported by the
/// plan runner; anything else is classified as an interpreter failure.
pub trait StepInterpreter {
    fn interpret(&self, step: &str, context: &StepContext) -> Result<Vec<MutationRequest>>;
}

/// Agent backed by an external command that reads a prompt on stdin.
pub struct CommandAgent {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    prompts: PromptEngine,
}

impl CommandAgent {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        if !config.is_configured() {
            bail!("no agent command configured; set [agent].command in the config file");
        }
        Ok(Self {
            command: config.command.clone(),
            timeout: config.timeout(),
            output_limit_bytes: config.output_limit_bytes,
            prompts: PromptEngine::new(),
        })
    }

    #[instrument(skip_all, fields(program = %self.command[0], prompt_bytes = prompt.len()))]
    fn run(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;
        if output.timed_out {
            warn!("agent command timed out");
            bail!(
                "agent command timed out after {}s",
                self.timeout.as_secs()
            );
        }
        if !output.status.success() {
            let detail = output.stderr_tail().unwrap_or_default();
            bail!("agent command failed ({}): {}", output.status, detail);
        }
        if output.stdout_truncated > 0 {
            warn!(
                dropped = output.stdout_truncated,
                "agent output exceeded limit"
            );
        }
        Ok(output.stdout_text())
    }
}

impl Planner for CommandAgent {
    fn plan(&self, task: &str, workspace_context: &str) -> Result<PlannerOutput> {
        let prompt = self.prompts.render_planner(task, workspace_context)?;
        let raw = self.run(&prompt).context("run planner")?;
        let steps = parse_steps(&raw);
        if steps.is_empty() {
            bail!("planner returned no steps");
        }
        info!(steps = steps.len(), "planner produced steps");
        Ok(PlannerOutput { steps, raw })
    }
}

impl StepInterpreter for CommandAgent {
    fn interpret(&self, step: &str, context: &StepContext) -> Result<Vec<MutationRequest>> {
        let prompt = self.prompts.render_interpreter(step, context)?;
        let raw = self.run(&prompt).context("run interpreter")?;
        parse_actions(&raw)
    }
}

/// Extract one step per non-empty line, stripping numbering and bullets.
pub fn parse_steps(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| STEP_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct WireAction {
    action: String,
    path: String,
    content: Option<String>,
    mode: Option<String>,
    search: Option<String>,
    line: Option<usize>,
    overwrite: Option<bool>,
}

impl WireAction {
    fn into_request(self) -> Result<MutationRequest> {
        let content = self.content.unwrap_or_default();
        let request = match self.action.to_ascii_lowercase().as_str() {
            // Interpreter-driven creates replace existing files unless told otherwise.
            "create" => MutationRequest::Create {
                path: self.path,
                content,
                overwrite: self.overwrite.unwrap_or(true),
            },
            "read" => MutationRequest::Read { path: self.path },
            "delete" => MutationRequest::Delete { path: self.path },
            "edit" => {
                let mode = self.mode.as_deref().unwrap_or("replace");
                let mode = match mode.to_ascii_lowercase().replace('_', "-").as_str() {
                    "replace" => EditMode::Replace,
                    "append" => EditMode::Append,
                    "insert" => EditMode::Insert {
                        line_index: self.line,
                    },
                    "find-replace" => EditMode::FindReplace {
                        search: self
                            .search
                            .ok_or_else(|| anyhow!("find-replace edit of {} has no search", self.path))?,
                    },
                    _ => {
                        return Err(EngineError::UnknownAction {
                            action: format!("edit mode {mode}"),
                        }
                        .into());
                    }
                };
                MutationRequest::Edit {
                    path: self.path,
                    edit: Edit { mode, content },
                }
            }
            _ => {
                return Err(EngineError::UnknownAction {
                    action: self.action,
                }
                .into());
            }
        };
        Ok(request)
    }
}

/// Decode interpreter output into mutation requests.
///
/// Accepts a bare JSON array or one wrapped in a fenced code block. The array
/// is checked against the embedded actions schema before decoding.
pub fn parse_actions(raw: &str) -> Result<Vec<MutationRequest>> {
    let body = FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .trim();
    let value: Value = serde_json::from_str(body).context("parse interpreter output as JSON")?;
    validate_actions(&value)?;
    let actions: Vec<WireAction> =
        serde_json::from_value(value).context("decode interpreter actions")?;
    debug!(actions = actions.len(), "decoded interpreter actions");
    actions.into_iter().map(WireAction::into_request).collect()
}

fn validate_actions(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(ACTIONS_SCHEMA).context("parse actions schema")?;
    let compiled =
        jsonschema::validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(value) {
        let messages = compiled
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "interpreter output failed schema validation: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
