//! Command layer over the engine and plan runner, plus the interactive shell.
//!
//! Every command yields a [`CommandResult`]; nothing raised by the engine,
//! the agent, or argument parsing escapes to the host loop. The shell parses
//! each input line with the same clap grammar as the command line.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::core::diff::{DiffLine, render};
use crate::core::types::{Edit, MutationResult, OperationKind, PlanId};
use crate::engine::{CreateOptions, ListOptions, MutationEngine, MutationOutcome};
use crate::error::EngineError;
use crate::io::agent::{Planner, StepInterpreter};
use crate::plan::{PlanEvent, PlanRun, PlanRunner};

/// Workspace entries handed to the planner as context.
const CONTEXT_ENTRY_LIMIT: usize = 200;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a file.
    Create {
        path: PathBuf,
        #[arg(long, default_value = "")]
        content: String,
        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,
        /// Skip the diff preview for overwrites.
        #[arg(long)]
        no_diff: bool,
    },
    /// Print a file.
    Read { path: PathBuf },
    /// Edit an existing file.
    Edit {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = EditModeArg::Replace)]
        mode: EditModeArg,
        /// New content, inserted line, appended line, or replacement text.
        #[arg(long, default_value = "")]
        content: String,
        /// Text to replace (find-replace).
        #[arg(long)]
        search: Option<String>,
        /// 0-based line index (insert); defaults to end of file.
        #[arg(long)]
        line: Option<usize>,
    },
    /// Delete a file.
    Delete { path: PathBuf },
    /// List a directory.
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        no_dirs: bool,
        #[arg(long)]
        include_ignored: bool,
    },
    /// Revert the most recent mutation.
    Undo,
    /// Re-apply the most recently undone mutation.
    Redo,
    /// Show the operation log.
    History,
    /// Clear the operation log (undo/redo stacks are kept).
    ClearLog,
    /// Ask the planner to break a task into steps.
    Plan {
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// List plans created in this session.
    Plans,
    /// Run a plan step by step, stopping at the first failure.
    Execute { plan_id: PlanId },
    /// Change the workspace root.
    Root { dir: PathBuf },
    /// Start the interactive shell (default).
    Shell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EditModeArg {
    Replace,
    Insert,
    FindReplace,
    Append,
}

/// Grammar for one shell input line.
#[derive(Debug, Parser)]
#[command(name = "quill", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Structured outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    pub fn render(&self, as_json: bool) -> String {
        if as_json {
            return serde_json::to_string(self).unwrap_or_else(|_| self.message.clone());
        }
        if self.ok {
            self.message.clone()
        } else {
            format!("error: {}", self.message)
        }
    }
}

impl From<&EngineError> for CommandResult {
    fn from(err: &EngineError) -> Self {
        Self::failure(err.to_string()).with_data(json!({ "kind": err.kind() }))
    }
}

/// What the host loop should do after a line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Result(CommandResult),
    Empty,
    Quit,
}

/// Engine, plan registry, and agents for one interactive session.
pub struct Session {
    engine: MutationEngine,
    runner: PlanRunner,
    planner: Option<Box<dyn Planner>>,
    interpreter: Option<Box<dyn StepInterpreter>>,
}

impl Session {
    pub fn new(engine: MutationEngine) -> Self {
        Self {
            engine,
            runner: PlanRunner::new(),
            planner: None,
            interpreter: None,
        }
    }

    pub fn with_agents(
        mut self,
        planner: Box<dyn Planner>,
        interpreter: Box<dyn StepInterpreter>,
    ) -> Self {
        self.planner = Some(planner);
        self.interpreter = Some(interpreter);
        self
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    pub fn runner(&self) -> &PlanRunner {
        &self.runner
    }

    /// Tokenize and dispatch one shell line.
    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        let tokens = match split_line(line) {
            Ok(tokens) => tokens,
            Err(message) => return LineOutcome::Result(CommandResult::failure(message)),
        };
        match tokens.first().map(String::as_str) {
            None => return LineOutcome::Empty,
            Some("quit" | "exit") => return LineOutcome::Quit,
            _ => {}
        }
        match ShellLine::try_parse_from(&tokens) {
            Ok(parsed) => LineOutcome::Result(self.execute(parsed.command)),
            Err(err) => {
                let rendered = err.render().to_string();
                LineOutcome::Result(CommandResult {
                    ok: !err.use_stderr(),
                    message: rendered.trim_end().to_string(),
                    data: None,
                })
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> CommandResult {
        debug!(?command, "dispatching command");
        match command {
            Command::Create {
                path,
                content,
                overwrite,
                no_diff,
            } => {
                let options = CreateOptions {
                    overwrite,
                    show_diff_preview: !no_diff && self.engine.options().diff_preview,
                };
                match self.engine.create(&path, &content, options) {
                    Ok(outcome) => self.outcome_result(&outcome),
                    Err(err) => CommandResult::from(&err),
                }
            }
            Command::Read { path } => match self.engine.read(&path) {
                Ok(content) => CommandResult::success(content.clone())
                    .with_data(json!({ "path": path, "content": content })),
                Err(err) => CommandResult::from(&err),
            },
            Command::Edit {
                path,
                mode,
                content,
                search,
                line,
            } => {
                let edit = match mode {
                    EditModeArg::Replace => Edit::replace(content),
                    EditModeArg::Append => Edit::append(content),
                    EditModeArg::Insert => Edit::insert(line, content),
                    EditModeArg::FindReplace => match search {
                        Some(search) => Edit::find_replace(search, content),
                        None => {
                            return CommandResult::failure("find-replace requires --search");
                        }
                    },
                };
                match self.engine.edit(&path, &edit) {
                    Ok(outcome) => self.outcome_result(&outcome),
                    Err(err) => CommandResult::from(&err),
                }
            }
            Command::Delete { path } => match self.engine.delete(&path) {
                Ok(outcome) => self.outcome_result(&outcome),
                Err(err) => CommandResult::from(&err),
            },
            Command::List {
                dir,
                no_dirs,
                include_ignored,
            } => {
                let options = ListOptions {
                    include_directories: !no_dirs,
                    include_ignored,
                };
                match self.engine.list(&dir, options) {
                    Ok(entries) => {
                        let message = entries
                            .iter()
                            .map(|e| if e.is_dir { format!("{}/", e.name) } else { e.name.clone() })
                            .collect::<Vec<_>>()
                            .join("\n");
                        CommandResult::success(message).with_data(&entries)
                    }
                    Err(err) => CommandResult::from(&err),
                }
            }
            Command::Undo => match self.engine.undo() {
                Ok(entry) => CommandResult::success(format!(
                    "undid {} {}",
                    entry.operation,
                    self.engine.display_path(&entry.path)
                ))
                .with_data(json!({ "operation": entry.operation, "path": entry.path })),
                Err(err) => CommandResult::from(&err),
            },
            Command::Redo => match self.engine.redo() {
                Ok(entry) => CommandResult::success(format!(
                    "redid {} {}",
                    entry.operation,
                    self.engine.display_path(&entry.path)
                ))
                .with_data(json!({ "operation": entry.operation, "path": entry.path })),
                Err(err) => CommandResult::from(&err),
            },
            Command::History => {
                let log = self.engine.log();
                if log.is_empty() {
                    return CommandResult::success("no operations recorded");
                }
                let message = log
                    .iter()
                    .map(|entry| {
                        format!(
                            "{} {:<6} {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            entry.operation.as_str(),
                            self.engine.display_path(&entry.path)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                CommandResult::success(message).with_data(log)
            }
            Command::ClearLog => {
                let cleared = self.engine.log().len();
                self.engine.clear_log();
                CommandResult::success(format!("cleared {cleared} log entries"))
            }
            Command::Plan { task } => self.create_plan(&task.join(" ")),
            Command::Plans => {
                let plans: Vec<_> = self.runner.plans().collect();
                if plans.is_empty() {
                    return CommandResult::success("no plans");
                }
                let message = plans
                    .iter()
                    .map(|plan| format!("{}: {} ({} steps)", plan.id, plan.task, plan.steps.len()))
                    .collect::<Vec<_>>()
                    .join("\n");
                CommandResult::success(message).with_data(&plans)
            }
            Command::Execute { plan_id } => self.execute_plan(plan_id),
            Command::Root { dir } => match self.engine.set_workspace_root(&dir) {
                Ok(()) => CommandResult::success(format!(
                    "workspace root is {}",
                    self.engine.root().display()
                ))
                .with_data(json!({ "root": self.engine.root() })),
                Err(err) => CommandResult::failure(format!("{err:#}")),
            },
            Command::Shell => CommandResult::failure("already in the shell"),
        }
    }

    fn outcome_result(&self, outcome: &MutationOutcome) -> CommandResult {
        let verb = match outcome.operation {
            OperationKind::Create if outcome.overwritten => "overwrote",
            OperationKind::Create => "created",
            OperationKind::Edit => "edited",
            OperationKind::Delete => "deleted",
            other => other.as_str(),
        };
        let mut message = format!("{verb} {}", self.engine.display_path(&outcome.path));
        append_diff(&mut message, &outcome.diff);
        CommandResult::success(message).with_data(outcome)
    }

    fn create_plan(&mut self, task: &str) -> CommandResult {
        let Some(planner) = self.planner.as_deref() else {
            return CommandResult::failure(
                "no agent command configured; set [agent].command in the config file",
            );
        };
        let context = workspace_context(&self.engine);
        match self.runner.create_plan(planner, task, &context) {
            Ok(plan) => {
                let mut message = format!("{}: {} steps", plan.id, plan.steps.len());
                for (index, step) in plan.steps.iter().enumerate() {
                    let _ = write!(message, "\n  {}. {step}", index + 1);
                }
                let _ = write!(message, "\nrun `execute {}` to apply it", plan.id);
                CommandResult::success(message).with_data(plan)
            }
            Err(err) => CommandResult::failure(format!("{err:#}")),
        }
    }

    fn execute_plan(&mut self, plan_id: PlanId) -> CommandResult {
        let Some(interpreter) = self.interpreter.as_deref() else {
            return CommandResult::failure(
                "no agent command configured; set [agent].command in the config file",
            );
        };
        let mut lines = Vec::new();
        let run = self
            .runner
            .run_plan(plan_id, interpreter, &mut self.engine, |event| {
                lines.push(describe_event(&event));
            });
        match run {
            Ok(run) => {
                lines.push(summarize_run(&run));
                CommandResult {
                    ok: run.succeeded(),
                    message: lines.join("\n"),
                    data: None,
                }
                .with_data(&run)
            }
            Err(err) => CommandResult::failure(format!("{err:#}")),
        }
    }
}

fn append_diff(message: &mut String, diff: &[DiffLine]) {
    if !diff.is_empty() {
        message.push('\n');
        message.push_str(render(diff).trim_end());
    }
}

fn describe_event(event: &PlanEvent<'_>) -> String {
    match event {
        PlanEvent::StepStarted { index, total, step } => {
            format!("step {}/{total}: {step}", index + 1)
        }
        PlanEvent::MutationApplied { result, .. } => describe_result(result),
        PlanEvent::StepCompleted { index, mutations } => {
            format!("step {} done ({mutations} mutations)", index + 1)
        }
        PlanEvent::StepFailed { failure } => format!(
            "step {} failed: {}",
            failure.step_index + 1,
            failure.message
        ),
    }
}

fn describe_result(result: &MutationResult) -> String {
    match &result.error {
        None => format!("  {} {}", result.operation, result.path),
        Some(err) => format!("  {} {} failed: {}", result.operation, result.path, err.message),
    }
}

fn summarize_run(run: &PlanRun) -> String {
    match &run.failure {
        None => format!(
            "{} completed: {}/{} steps",
            run.plan_id, run.steps_completed, run.total_steps
        ),
        Some(failure) => format!(
            "{} failed at step {} ({}): {}/{} steps completed; use undo to revert",
            run.plan_id,
            failure.step_index + 1,
            failure.kind.as_str(),
            run.steps_completed,
            run.total_steps
        ),
    }
}

/// Top-level workspace listing, one entry per line, directories suffixed with `/`.
fn workspace_context(engine: &MutationEngine) -> String {
    match engine.list(".", ListOptions::default()) {
        Ok(entries) => entries
            .iter()
            .take(CONTEXT_ENTRY_LIMIT)
            .map(|e| if e.is_dir { format!("{}/", e.path) } else { e.path.clone() })
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => String::new(),
    }
}

/// Split a shell line into words with POSIX quoting rules.
pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    shell_words::split(line).map_err(|err| format!("invalid command line: {err}"))
}

/// Read commands from `input` until end of input or `quit`.
pub fn run_shell<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    mut output: W,
    as_json: bool,
) -> Result<()> {
    let prompt = !as_json;
    if prompt {
        write!(output, "quill> ").context("write prompt")?;
        output.flush().context("flush output")?;
    }
    for line in input.lines() {
        let line = line.context("read input line")?;
        match session.handle_line(&line) {
            LineOutcome::Quit => break,
            LineOutcome::Empty => {}
            LineOutcome::Result(result) => {
                writeln!(output, "{}", result.render(as_json)).context("write result")?;
            }
        }
        if prompt {
            write!(output, "quill> ").context("write prompt")?;
            output.flush().context("flush output")?;
        }
    }
    Ok(())
}
