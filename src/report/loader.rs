//! Report discovery and parsing

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::{ReportDocument, ReportError};

pub const REPORT_PREFIX: &str = "scoutsuite_results_";
pub const REPORT_SUFFIX: &str = ".js";

/// Result of walking a report directory
#[derive(Debug, Default)]
pub struct Discovery {
    /// Matching report files in walk order
    pub reports: Vec<PathBuf>,
    /// Entries the walk could not read; they are skipped
    pub errors: Vec<String>,
}

/// Read a ScoutSuite results file and parse everything after its first line as JSON
pub fn load(path: &Path) -> Result<ReportDocument, ReportError> {
    let content = fs::read(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // The wrapper line is skipped unread; only the body has to be valid UTF-8 JSON
    let Some(newline) = content.iter().position(|&b| b == b'\n') else {
        return Err(ReportError::MalformedReport {
            path: path.to_path_buf(),
            reason: "not enough data in file (expected a wrapper line followed by JSON)"
                .to_string(),
        });
    };

    let body = &content[newline + 1..];
    let root = serde_json::from_slice(body).map_err(|e| ReportError::MalformedReport {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(ReportDocument::new(path, root))
}

/// Whether a file name looks like a ScoutSuite results file
pub fn is_report_file_name(name: &str) -> bool {
    name.starts_with(REPORT_PREFIX) && name.ends_with(REPORT_SUFFIX)
}

/// Recursively collect every ScoutSuite results file below `root`
///
/// Unreadable entries are logged and recorded in [`Discovery::errors`]; the
/// walk always continues.
pub fn discover_reports(root: &Path) -> Discovery {
    let mut discovery = Discovery::default();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                if is_file && is_report_file_name(&entry.file_name().to_string_lossy()) {
                    discovery.reports.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                discovery.errors.push(format!("filepath walk error: {e}"));
            }
        }
    }

    tracing::debug!(
        "Discovered {} report(s) under {}",
        discovery.reports.len(),
        root.display()
    );
    discovery
}
