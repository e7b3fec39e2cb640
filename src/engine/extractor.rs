//! Finding extraction over parsed reports
//!
//! ScoutSuite lists the resources that violate a rule as dot paths into its
//! `services` tree, e.g. `iam.users.AIDA1.AccessKeys.0`. Those references are
//! turned back into queries to read fields of the flagged resource.

use serde_json::Value;

use crate::report::{Query, ReportDocument, ReportError};

/// References produced by one finding query
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AffectedReferences {
    pub references: Vec<String>,
    /// Objects found where references were expected; they are reported and skipped
    pub anomalies: Vec<String>,
}

/// Convert a ScoutSuite dot reference into query syntax
///
/// Purely numeric segments become bracket indices on the preceding segment:
/// `iam.3.UserName` becomes `.iam[3].UserName`. The result always starts with
/// a single `.`.
pub fn transform_path(reference: &str) -> String {
    let mut result = String::new();

    for (i, part) in reference.split('.').enumerate() {
        match numeric_segment(part) {
            Some(index) => result.push_str(&format!("[{index}]")),
            None => {
                if i > 0 {
                    result.push('.');
                }
                result.push_str(part);
            }
        }
    }

    format!(".{result}")
}

fn numeric_segment(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Query for `field` of the resource a reference points at
pub fn resource_query(reference: &str, field: &str) -> String {
    let path = transform_path(reference);
    let path = if path == "." { "" } else { path.as_str() };
    format!(".services{path}.{field}")
}

/// Count what [`find_affected`] would return without collecting it
///
/// This is the first of two passes over the same query; the count lets the UI
/// show "N of M" before any resource is resolved.
pub fn count_affected(doc: &ReportDocument, query: &Query) -> Result<usize, ReportError> {
    let mut count = 0;
    for value in query.run(doc.root()) {
        count += match value? {
            Value::Array(items) => items.len(),
            Value::Null | Value::Object(_) => 0,
            _ => 1,
        };
    }
    Ok(count)
}

/// Run a finding query and flatten its output into resource references
///
/// Strings yield one reference, arrays one per element, other scalars are
/// stringified. An evaluation error aborts the whole query.
pub fn find_affected(
    doc: &ReportDocument,
    query: &Query,
) -> Result<AffectedReferences, ReportError> {
    let mut found = AffectedReferences::default();

    for value in query.run(doc.root()) {
        match value? {
            Value::String(reference) => found.references.push(reference.clone()),
            Value::Array(items) => found.references.extend(items.iter().map(text_of)),
            Value::Null => {}
            Value::Object(_) => found.anomalies.push(
                ReportError::UnexpectedValueShape {
                    query: query.source().to_string(),
                    found: "an object".to_string(),
                }
                .to_string(),
            ),
            scalar => found.references.push(text_of(scalar)),
        }
    }

    Ok(found)
}

/// Read a single value; arrays give their first element and absence gives ""
pub fn resolve_field(doc: &ReportDocument, path: &str) -> Result<String, ReportError> {
    let query = Query::parse(path)?;

    match query.run(doc.root()).next() {
        None => Ok(String::new()),
        Some(value) => match value? {
            Value::Null => Ok(String::new()),
            Value::Array(items) => Ok(items.first().map(text_of).unwrap_or_default()),
            Value::Object(_) => Err(ReportError::UnexpectedValueShape {
                query: path.to_string(),
                found: "an object".to_string(),
            }),
            scalar => Ok(text_of(scalar)),
        },
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
