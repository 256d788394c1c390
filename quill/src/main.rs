//! Sandboxed workspace mutation CLI.
//!
//! Applies create/read/edit/delete operations under a workspace root with
//! undo/redo, and runs agent-produced plans one step at a time. With no
//! command it starts an interactive shell on stdin.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use quill::engine::{EngineOptions, MutationEngine};
use quill::exit_codes;
use quill::io::agent::CommandAgent;
use quill::io::config::{config_path, load_config};
use quill::logging;
use quill::shell::{Command, Session, run_shell};

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "Sandboxed workspace mutations with undo/redo and agent-driven plans"
)]
struct Cli {
    /// Workspace root (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Config file (defaults to `<root>/.quill/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Permit paths that resolve outside the workspace root.
    #[arg(long, global = true)]
    allow_outside_workspace: bool,
    /// Print results as JSON, one object per line.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let config_file = cli.config.unwrap_or_else(|| config_path(&root));
    let config = load_config(&config_file)?;

    let mut options = EngineOptions::from(&config.workspace);
    options.allow_outside_workspace |= cli.allow_outside_workspace;
    let engine = MutationEngine::new(&root, options)?;

    let mut session = Session::new(engine);
    if config.agent.is_configured() {
        session = session.with_agents(
            Box::new(CommandAgent::from_config(&config.agent)?),
            Box::new(CommandAgent::from_config(&config.agent)?),
        );
    }

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            run_shell(&mut session, io::stdin().lock(), io::stdout().lock(), cli.json)?;
            Ok(exit_codes::OK)
        }
        command => {
            let result = session.execute(command);
            let rendered = result.render(cli.json);
            if result.ok || cli.json {
                println!("{rendered}");
            } else {
                eprintln!("{rendered}");
            }
            Ok(if result.ok {
                exit_codes::OK
            } else {
                exit_codes::FAILED
            })
        }
    }
}
