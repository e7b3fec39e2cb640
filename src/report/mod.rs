//! ScoutSuite report handling
//!
//! Reports are discovered on disk, stripped of their JavaScript wrapper line and
//! parsed into read-only [`ReportDocument`]s. Values are pulled out of a document
//! with the small path language in [`query`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

pub mod loader;
pub mod query;

pub use loader::{Discovery, REPORT_PREFIX, REPORT_SUFFIX, discover_reports, load};
pub use query::Query;

/// Failures raised while loading or querying a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not have the `<wrapper line>\n<json>` shape
    #[error("malformed report {path}: {reason}")]
    MalformedReport { path: PathBuf, reason: String },

    /// The query expression itself is invalid
    #[error("cannot parse query `{query}`: {reason}")]
    QueryParse { query: String, reason: String },

    /// The query was valid but failed against this document
    #[error("query `{query}` failed: {reason}")]
    QueryEvaluation { query: String, reason: String },

    /// The query produced a value of a shape the caller cannot use
    #[error("query `{query}` returned {found}, expected a string or an array")]
    UnexpectedValueShape { query: String, found: String },
}

/// One parsed ScoutSuite results file
#[derive(Debug, Clone)]
pub struct ReportDocument {
    path: PathBuf,
    root: Value,
}

impl ReportDocument {
    pub fn new(path: impl Into<PathBuf>, root: Value) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// File the document was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// File name used in status and debug messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Short description of a JSON value's kind for error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
