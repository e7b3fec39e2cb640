//! Reporting platform interface and wire types
//!
//! Pwndoc wraps every payload as `{"status": "...", "datas": ...}`. Only the
//! fields the pipeline reads are typed; sections keep every other field so a
//! modified section can be submitted back whole.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[async_trait]
pub trait ReportingApi: Send + Sync {
    async fn get_audits(&self) -> Result<Vec<AuditSummary>>;

    async fn get_audit(&self, id: &str) -> Result<Audit>;

    async fn put_json(&self, path: &str, body: &Value) -> Result<ApiReply>;

    async fn post_json(&self, path: &str, body: &Value) -> Result<ApiReply>;

    async fn export_vulnerability_templates(&self) -> Result<Vec<VulnerabilityTemplate>>;
}

/// Raw outcome of a write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the `datas` member of the body
    pub fn datas<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        let envelope: Envelope<T> =
            serde_json::from_slice(&self.body).context("Response body is not a Pwndoc envelope")?;
        Ok(envelope.datas)
    }
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: String,
    pub datas: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Audit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "customFields", default)]
    pub custom_fields: Vec<CustomFieldValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    #[serde(rename = "customField")]
    pub definition: CustomFieldDefinition,
    /// Usually HTML text; other shapes are left untouched
    #[serde(default)]
    pub text: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VulnerabilityTemplate {
    #[serde(default)]
    pub details: Vec<TemplateDetail>,
    #[serde(default)]
    pub cvssv3: Option<String>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(rename = "remediationComplexity", default)]
    pub remediation_complexity: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Localised text of a vulnerability template
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateDetail {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "vulnType", default)]
    pub vuln_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Body of `POST /api/audits/{id}/findings`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFinding {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vuln_type: Option<String>,
    pub description: String,
    pub observation: String,
    pub remediation: String,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvssv3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_complexity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub scope: String,
    pub poc: String,
}

/// Body of `POST /api/images`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUpload {
    pub value: String,
    pub name: String,
    #[serde(rename = "auditId")]
    pub audit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    #[serde(rename = "_id")]
    pub id: String,
}
