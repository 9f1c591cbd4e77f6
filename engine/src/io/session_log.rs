//! Append-only session log, a write-only diagnostic sink.
//!
//! Distinct from tracing: tracing is dev diagnostics behind `RUST_LOG`,
//! while this file is a product artifact that accumulates one line per
//! engine event across sessions. The engine never reads it back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub fn append(&self, record: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open session log {}", self.path.display()))?;
        writeln!(file, "{record}")
            .with_context(|| format!("append to session log {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn appends_records_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = SessionLog::new(temp.path().join("log.txt"));

        log.append("first").expect("append");
        log.append("second").expect("append");

        let contents = fs::read_to_string(log.path()).expect("read");
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn creates_the_file_on_first_append() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = SessionLog::new(temp.path().join("log.txt"));
        assert!(!log.path().exists());

        log.append("record").expect("append");
        assert!(log.path().is_file());
    }
}
