//! Workspace scaffolding: handler storage, priming prompt, session log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::{EngineConfig, write_config};

/// Canonical paths for the engine's workspace resources.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub root: PathBuf,
    pub handlers_dir: PathBuf,
    pub priming_prompt_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
}

impl EnginePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            handlers_dir: root.join("handlers"),
            priming_prompt_path: root.join("priming_prompt.txt"),
            log_path: root.join("log.txt"),
            config_path: root.join("engine.toml"),
            root,
        }
    }
}

/// Options for [`setup_workspace`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, rewrite the priming-prompt placeholder and default config
    /// even when the files exist. Handlers and the log are never touched.
    pub force: bool,
}

const PRIMING_PLACEHOLDER: &str =
    "# Add your command documentation here for the model to read.\n";

/// Ensure the workspace resources exist, creating any that are missing.
/// Safe to call repeatedly.
pub fn setup_workspace(root: &Path, options: &InitOptions) -> Result<EnginePaths> {
    let paths = EnginePaths::new(root);

    fs::create_dir_all(&paths.handlers_dir)
        .with_context(|| format!("create directory {}", paths.handlers_dir.display()))?;

    if options.force || !paths.priming_prompt_path.exists() {
        fs::write(&paths.priming_prompt_path, PRIMING_PLACEHOLDER)
            .with_context(|| format!("write {}", paths.priming_prompt_path.display()))?;
    }
    if !paths.log_path.exists() {
        fs::write(&paths.log_path, "")
            .with_context(|| format!("create {}", paths.log_path.display()))?;
    }
    if options.force || !paths.config_path.exists() {
        write_config(&paths.config_path, &EngineConfig::default())?;
    }

    Ok(paths)
}

/// Read the system prompt that primes every completion request.
pub fn read_priming_prompt(paths: &EnginePaths) -> Result<String> {
    fs::read_to_string(&paths.priming_prompt_path)
        .with_context(|| format!("read priming prompt {}", paths.priming_prompt_path.display()))
}
