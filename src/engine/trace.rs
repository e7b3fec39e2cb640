//! Coarse append-only progress trace
//!
//! The file is opened, appended and closed on every write; no handle is kept
//! between writes, so concurrent workers can share one trace path.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_TRACE_FILE: &str = "s3progress.log";

#[derive(Debug, Clone)]
pub struct ProgressTrace {
    path: PathBuf,
}

impl ProgressTrace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open trace file: {}", self.path.display()))?;

        writeln!(file, "{line}")
            .with_context(|| format!("Failed to write trace file: {}", self.path.display()))?;
        Ok(())
    }
}

impl Default for ProgressTrace {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_FILE)
    }
}
