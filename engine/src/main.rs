//! Marker-protocol agent CLI.
//!
//! `run` drives an interactive agent session against the configured model.
//! `exec` dispatches a single command without a model turn, which is the
//! quickest way to try a handler by hand.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use engine::core::parser::Invocation;
use engine::core::types::Authoring;
use engine::dispatch::{Dispatcher, Flow};
use engine::io::config::load_config;
use engine::io::init::{InitOptions, setup_workspace};
use engine::io::registry::HandlerRegistry;
use engine::io::transport::OpenAiTransport;
use engine::looping::{Console, StdConsole, is_exit_token, run_session};

#[derive(Parser)]
#[command(name = "engine", version, about = "Marker-protocol autonomous agent loop")]
struct Cli {
    /// Workspace root holding handlers/, priming_prompt.txt and engine.toml.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create handlers/, priming_prompt.txt, log.txt and engine.toml if missing.
    Init {
        /// Rewrite the placeholder prompt and default config even if present.
        #[arg(short, long)]
        force: bool,
    },
    /// Run an interactive agent session.
    Run,
    /// Dispatch one command without a model turn, e.g. `exec greet "hi there"`.
    Exec {
        /// Command name followed by its arguments.
        #[arg(required = true)]
        command: Vec<String>,
    },
    /// List registered handler names.
    Handlers,
}

fn main() {
    engine::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, force),
        Command::Run => cmd_run(&cli.root),
        Command::Exec { command } => cmd_exec(&cli.root, &command),
        Command::Handlers => cmd_handlers(&cli.root),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = setup_workspace(root, &InitOptions { force })?;
    println!("initialized workspace at {}", paths.root.display());
    Ok(())
}

fn cmd_run(root: &Path) -> Result<()> {
    let paths = setup_workspace(root, &InitOptions { force: false })?;
    let config = load_config(&paths.config_path)?;

    let mut console = StdConsole;
    let Some(api_key) = resolve_api_key(&config.model.api_key_env, &mut console)? else {
        return Ok(());
    };

    let transport = OpenAiTransport::with_base_url(
        api_key,
        config.model.name.clone(),
        config.model.base_url.clone(),
    )?;
    transport
        .verify()
        .context("verify model credentials before starting the session")?;

    let summary = run_session(&paths, &config, &transport, &mut console)?;
    println!(
        "session ended after {} model turns ({} tasks completed)",
        summary.turns, summary.tasks_completed
    );
    Ok(())
}

/// Read the API key from the configured env var, falling back to an
/// interactive prompt. Returns `None` when the user backs out.
fn resolve_api_key(env_var: &str, console: &mut StdConsole) -> Result<Option<String>> {
    if let Ok(key) = env::var(env_var)
        && !key.trim().is_empty()
    {
        return Ok(Some(key));
    }
    let Some(entered) = console.read_line(&format!("{env_var} is not set; enter API key: "))?
    else {
        return Ok(None);
    };
    if is_exit_token(&entered) {
        return Ok(None);
    }
    if entered.trim().is_empty() {
        return Err(anyhow!("an API key is required to start a session"));
    }
    Ok(Some(entered))
}

fn cmd_exec(root: &Path, command: &[String]) -> Result<()> {
    let (name, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("no command given"))?;

    let paths = setup_workspace(root, &InitOptions { force: false })?;
    let config = load_config(&paths.config_path)?;
    let registry = HandlerRegistry::new(&paths.handlers_dir, &config.handler.extension);
    let dispatcher = Dispatcher::new(&config, &registry);

    let invocation = Invocation {
        name: name.clone(),
        args: args.to_vec(),
    };
    let mut authoring = Authoring::Inactive;
    match dispatcher.dispatch(&invocation, &mut authoring) {
        Flow::Continue(result) => println!("{result}"),
        Flow::Finished(message) => println!("{message}"),
        Flow::NeedsInput(prompt) => println!("{prompt}"),
    }
    Ok(())
}

fn cmd_handlers(root: &Path) -> Result<()> {
    let paths = setup_workspace(root, &InitOptions { force: false })?;
    let config = load_config(&paths.config_path)?;
    let registry = HandlerRegistry::new(&paths.handlers_dir, &config.handler.extension);
    for name in registry.list()? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["engine", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["engine", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_exec_collects_command_words() {
        let cli = Cli::parse_from(["engine", "exec", "greet", "hi there"]);
        let Command::Exec { command } = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(command, vec!["greet".to_string(), "hi there".to_string()]);
    }

    #[test]
    fn parse_custom_root() {
        let cli = Cli::parse_from(["engine", "--root", "/tmp/ws", "handlers"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/ws"));
    }
}
