//! Filesystem-backed registry of named executable handlers.
//!
//! One file per handler, named after the handler. Entries are create-only:
//! a name is never overwritten by the engine, and removal is a manual
//! operation outside it. Under the engine's single-threaded loop the
//! existence check and the write below cannot interleave; a concurrent
//! variant would have to serialize them.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

/// Why a handler could not be created.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler name '{0}' is not allowed (use A-Za-z0-9._- only)")]
    InvalidName(String),
    #[error("handler '{0}' already exists")]
    Collision(String),
    #[error("failed to persist handler '{name}': {source}")]
    Persist {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Directory of handler scripts.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    dir: PathBuf,
    extension: String,
}

impl HandlerRegistry {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// A handler name must work as a bare file stem; anything that could
    /// traverse paths is rejected.
    pub fn validate_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }

    /// Resolve a handler name to its script path, if registered.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !Self::validate_name(name) {
            return None;
        }
        let path = self.path_for(name);
        path.is_file().then_some(path)
    }

    /// Persist a new handler. All-or-nothing: on any failure the registry
    /// is left exactly as it was, and no truncated file can be observed
    /// (temp write, then rename).
    pub fn create(&self, name: &str, contents: &str) -> Result<PathBuf, RegistryError> {
        if !Self::validate_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let path = self.path_for(name);
        if path.exists() {
            return Err(RegistryError::Collision(name.to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|source| persist_err(name, source))?;
        let tmp_path = path.with_extension(format!("{}.tmp", self.extension));
        fs::write(&tmp_path, contents).map_err(|source| persist_err(name, source))?;
        fs::rename(&tmp_path, &path).map_err(|source| persist_err(name, source))?;

        info!(name, path = %path.display(), "handler created");
        Ok(path)
    }

    /// Sorted names of all registered handlers.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("read handler directory {}", self.dir.display()))?
        {
            let path = entry.context("read handler directory entry")?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn persist_err(name: &str, source: std::io::Error) -> RegistryError {
    RegistryError::Persist {
        name: name.to_string(),
        source,
    }
}
