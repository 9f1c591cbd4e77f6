//! Engine configuration stored in `engine.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to working values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget for one dispatched child process, in seconds.
    pub command_timeout_secs: u64,

    /// Truncate captured child stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub model: ModelConfig,
    pub handler: HandlerConfig,
    pub shell: ShellConfig,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent with each completion request.
    pub name: String,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

/// How handler scripts are invoked and named.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HandlerConfig {
    /// Interpreter argv prefix; the script path and arguments are appended.
    pub interpreter: Vec<String>,
    /// File extension for handler scripts (no leading dot).
    pub extension: String,
}

/// How the reserved local-shell command is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell argv prefix; the command line is appended as one argument.
    pub command: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            interpreter: vec!["python3".to_string()],
            extension: "py".to_string(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: vec!["sh".to_string(), "-c".to_string()],
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            output_limit_bytes: 100_000,
            model: ModelConfig::default(),
            handler: HandlerConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.model.name.trim().is_empty() {
            return Err(anyhow!("model.name must not be empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must not be empty"));
        }
        if self.handler.interpreter.is_empty() || self.handler.interpreter[0].trim().is_empty() {
            return Err(anyhow!("handler.interpreter must be a non-empty array"));
        }
        if self.handler.extension.is_empty()
            || !self
                .handler
                .extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(anyhow!("handler.extension must be alphanumeric"));
        }
        if self.shell.command.is_empty() || self.shell.command[0].trim().is_empty() {
            return Err(anyhow!("shell.command must be a non-empty array"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
