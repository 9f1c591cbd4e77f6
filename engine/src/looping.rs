//! Interactive session driver: the turn-based loop over model, parser,
//! dispatcher, and synthesizer.
//!
//! One logical thread owns everything here. The conversation history and
//! the authoring state are locals threaded through each turn, and the only
//! blocking operations are the completion request and child-process
//! execution, both bounded by their own timeouts.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::parser::{ParseOutcome, parse_response};
use crate::core::types::{Authoring, Message};
use crate::dispatch::{Dispatcher, Flow};
use crate::io::config::EngineConfig;
use crate::io::feedback::FeedbackEngine;
use crate::io::init::{EnginePaths, read_priming_prompt};
use crate::io::registry::HandlerRegistry;
use crate::io::session_log::SessionLog;
use crate::io::transport::ModelTransport;
use crate::synthesis::synthesize_handler;

/// Terminal seam for the interactive loop.
///
/// `read_line` returns `None` on end of input, which ends the session the
/// same way an exit token does.
pub trait Console {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
    fn print(&mut self, text: &str);
}

/// Console over stdin/stdout.
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}").context("write prompt")?;
        stdout.flush().context("flush prompt")?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).context("read stdin")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn print(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Model turns consumed.
    pub turns: u32,
    /// Task-finished signals handled.
    pub tasks_completed: u32,
}

/// True for the tokens that end the session at any interactive prompt.
pub fn is_exit_token(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "exit" | "quit")
}

/// Drive the agent loop until the user exits.
///
/// The session owns the conversation history: append-only while a task is
/// in flight, cleared exactly when a task-finished signal is handled. A
/// pending authoring session claims the next model turn as handler source
/// and is cleared whether or not synthesis succeeds.
pub fn run_session<T: ModelTransport, C: Console>(
    paths: &EnginePaths,
    config: &EngineConfig,
    transport: &T,
    console: &mut C,
) -> Result<SessionSummary> {
    let system_prompt = read_priming_prompt(paths)?;
    let registry = HandlerRegistry::new(&paths.handlers_dir, &config.handler.extension);
    let dispatcher = Dispatcher::new(config, &registry);
    let feedback = FeedbackEngine::new();
    let log = SessionLog::new(&paths.log_path);

    let mut history: Vec<Message> = Vec::new();
    let mut authoring = Authoring::Inactive;
    let mut summary = SessionSummary::default();

    loop {
        if history.is_empty() {
            let Some(goal) = console.read_line("you> ")? else {
                break;
            };
            if is_exit_token(&goal) {
                break;
            }
            if goal.trim().is_empty() {
                continue;
            }
            history.push(Message::user(goal));
        }

        let response = match transport.complete(&system_prompt, &history) {
            Ok(text) => text,
            Err(err) => {
                // The model never produced this turn, so it cannot close an
                // authoring session; report in-band and retry next cycle.
                let diagnostic = format!("[TRANSPORT ERROR] {err}");
                console.print(&diagnostic);
                log.append(&diagnostic)?;
                history.push(Message::assistant(diagnostic));
                history.push(Message::user(feedback.transport_failure(&err.to_string())?));
                continue;
            }
        };
        summary.turns += 1;

        // A pending authoring session claims the whole turn as handler source.
        if let Some(name) = authoring.take() {
            let result = match synthesize_handler(&registry, &name, &response) {
                Ok(path) => format!("[SUCCESS] Command '{name}' created at {}.", path.display()),
                Err(err) => format!("[ERROR] {err}"),
            };
            console.print(&result);
            log.append(&format!("synthesize '{name}': {}", first_line(&result)))?;
            history.push(Message::assistant(response));
            history.push(Message::user(feedback.authoring_result(&result)?));
            continue;
        }

        console.print(&response);
        history.push(Message::assistant(response.clone()));

        match parse_response(&response) {
            ParseOutcome::NoCommand => {
                debug!("turn carried no command");
                history.push(Message::user(feedback.no_command()?));
            }
            ParseOutcome::InvalidSyntax { raw } => {
                let result = format!("[ERROR] Invalid command syntax: '{raw}'");
                console.print(&result);
                log.append(&result)?;
                history.push(Message::user(feedback.command_result(&result)?));
            }
            ParseOutcome::Command(invocation) => {
                match dispatcher.dispatch(&invocation, &mut authoring) {
                    Flow::Continue(result) => {
                        console.print(&result);
                        log.append(&format!(
                            "dispatch '{}': {}",
                            invocation.name,
                            first_line(&result)
                        ))?;
                        history.push(Message::user(feedback.command_result(&result)?));
                    }
                    Flow::Finished(message) => {
                        console.print(&message);
                        log.append(&format!("task complete: {message}"))?;
                        info!("task finished, awaiting a new goal");
                        history.clear();
                        summary.tasks_completed += 1;
                    }
                    Flow::NeedsInput(prompt) => {
                        console.print(&prompt);
                        let Some(reply) = console.read_line("you> ")? else {
                            break;
                        };
                        if is_exit_token(&reply) {
                            break;
                        }
                        history.push(Message::user(reply));
                    }
                }
            }
        }
    }

    info!(
        turns = summary.turns,
        tasks_completed = summary.tasks_completed,
        "session ended"
    );
    Ok(summary)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_tokens_are_case_insensitive() {
        for token in ["exit", "EXIT", "Quit", " quit "] {
            assert!(is_exit_token(token), "{token} should end the session");
        }
        assert!(!is_exit_token("exit now"));
        assert!(!is_exit_token("continue"));
    }
}
