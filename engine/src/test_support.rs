//! Test-only scripted implementations of the session seams.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use anyhow::Result;

use crate::core::types::Message;
use crate::io::config::EngineConfig;
use crate::io::init::{EnginePaths, InitOptions, setup_workspace};
use crate::io::transport::{ModelTransport, TransportError};
use crate::looping::Console;

/// One scripted model turn: a reply or a transport failure.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Reply(String),
    Fail(String),
}

/// Transport that replays queued turns and records every history it was
/// handed, so tests can assert on what the model would have seen.
pub struct ScriptedTransport {
    turns: RefCell<VecDeque<ScriptedTurn>>,
    histories: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedTransport {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: RefCell::new(turns.into()),
            histories: RefCell::new(Vec::new()),
        }
    }

    /// Convenience constructor for all-reply scripts.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|text| ScriptedTurn::Reply((*text).to_string()))
                .collect(),
        )
    }

    /// Histories passed to `complete`, in call order.
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.borrow().clone()
    }
}

impl ModelTransport for ScriptedTransport {
    fn complete(
        &self,
        _system_prompt: &str,
        history: &[Message],
    ) -> Result<String, TransportError> {
        self.histories.borrow_mut().push(history.to_vec());
        match self.turns.borrow_mut().pop_front() {
            Some(ScriptedTurn::Reply(text)) => Ok(text),
            Some(ScriptedTurn::Fail(message)) => Err(TransportError::Api {
                status: 500,
                message,
            }),
            None => Err(TransportError::InvalidResponse(
                "scripted transport exhausted".to_string(),
            )),
        }
    }
}

/// Console that replays queued inputs and records everything printed.
/// An exhausted input queue reads as end of input.
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub printed: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| (*s).to_string()).collect(),
            printed: Vec::new(),
        }
    }

    pub fn printed_joined(&self) -> String {
        self.printed.join("\n")
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }

    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }
}

/// A scaffolded engine workspace in a temp directory.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
    pub paths: EnginePaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = setup_workspace(temp.path(), &InitOptions { force: false })?;
        Ok(Self { temp, paths })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Config tuned for tests: handlers are `sh` scripts, short timeout.
    pub fn shell_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.command_timeout_secs = 5;
        config.handler.interpreter = vec!["sh".to_string()];
        config.handler.extension = "sh".to_string();
        config
    }
}
