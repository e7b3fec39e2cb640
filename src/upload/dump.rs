//! Local copies of upload response bodies

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const RESPONSES_DIR: &str = "responses";

/// Writes each response body to its own numbered file
pub struct ResponseDump {
    dir: PathBuf,
    sequence: AtomicUsize,
}

impl ResponseDump {
    /// Dumps go to `<output_dir>/responses`
    pub fn new(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.join(RESPONSES_DIR),
            sequence: AtomicUsize::new(1),
        }
    }

    pub fn write(&self, label: &str, body: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("{sequence:03}-{}.json", file_label(label)));
        std::fs::write(&path, body)
            .with_context(|| format!("Failed to write response dump: {}", path.display()))?;
        Ok(path)
    }
}

fn file_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
