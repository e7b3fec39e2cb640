//! Configuration management for scoutdoc
//!
//! The wizard configuration is a flat JSON object stored in `config.json` in
//! the working directory. Loading layers built-in defaults, the file (when it
//! exists) and `SCOUTDOC_*` environment variables through figment. Saving
//! always writes the whole object pretty-printed.

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod fields;

pub use fields::{ConfigField, FIELDS, FieldKey};

/// Default configuration file name
pub const CONFIG_FILE: &str = "config.json";

/// Prefix of environment variables overriding file values
pub const ENV_PREFIX: &str = "SCOUTDOC_";

/// Settings collected by the configuration wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Base URL of the Pwndoc instance
    #[serde(alias = "PwndocUrl")]
    pub pwndoc_url: String,

    pub pwndoc_username: String,

    pub pwndoc_password: String,

    /// Name of the audit findings are added to
    #[serde(alias = "PwndocAuditName")]
    pub pwndoc_audit_name: String,

    /// Directory for screenshots and upload response dumps
    #[serde(alias = "OutputDir")]
    pub output_dir: String,

    /// Root searched for `scoutsuite_results_*.js` files
    #[serde(alias = "ScoutSuiteReport")]
    pub scout_suite_reports_dir: String,

    #[serde(alias = "AwsAccessKey")]
    pub aws_access_key: String,

    #[serde(alias = "AwsSecretKey")]
    pub aws_secret_key: String,

    #[serde(alias = "AwsToken")]
    pub aws_token: String,

    /// Audit section holding the cloud narrative
    pub narrative_section: String,

    /// Custom field label inside the narrative section
    pub narrative_field: String,

    /// Accept self-signed certificates from the Pwndoc instance
    pub accept_invalid_certs: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            pwndoc_url: fields::DEFAULT_PWNDOC_URL.to_string(),
            pwndoc_username: String::new(),
            pwndoc_password: String::new(),
            pwndoc_audit_name: String::new(),
            output_dir: fields::DEFAULT_OUTPUT_DIR.to_string(),
            scout_suite_reports_dir: fields::DEFAULT_REPORTS_DIR.to_string(),
            aws_access_key: String::new(),
            aws_secret_key: String::new(),
            aws_token: String::new(),
            narrative_section: fields::DEFAULT_NARRATIVE_SECTION.to_string(),
            narrative_field: fields::DEFAULT_NARRATIVE_FIELD.to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl WizardConfig {
    /// Load `path` if it exists (defaults otherwise), then the environment
    ///
    /// The file is parsed by serde first so legacy key names resolve to their
    /// snake_case fields before figment sees them.
    pub fn load(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            Self::load_from_file(path)?
        } else {
            WizardConfig::default()
        };

        Self::figment(file)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    fn figment(file: WizardConfig) -> Figment {
        Figment::from(Serialized::defaults(file)).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Parse a configuration file without defaults or environment layering
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: WizardConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file as 2-space indented JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Run every field validator, failing on the first invalid value
    pub fn validate(&self) -> Result<()> {
        for field in FIELDS {
            if let Err(reason) = (field.validator)(&self.value(field.key)) {
                anyhow::bail!("{}: {}", field.label, reason);
            }
        }
        Ok(())
    }

    /// Current value of a field in its text form
    pub fn value(&self, key: FieldKey) -> String {
        match key {
            FieldKey::PwndocUrl => self.pwndoc_url.clone(),
            FieldKey::PwndocUsername => self.pwndoc_username.clone(),
            FieldKey::PwndocPassword => self.pwndoc_password.clone(),
            FieldKey::PwndocAuditName => self.pwndoc_audit_name.clone(),
            FieldKey::OutputDir => self.output_dir.clone(),
            FieldKey::ScoutSuiteReportsDir => self.scout_suite_reports_dir.clone(),
            FieldKey::AwsAccessKey => self.aws_access_key.clone(),
            FieldKey::AwsSecretKey => self.aws_secret_key.clone(),
            FieldKey::AwsToken => self.aws_token.clone(),
            FieldKey::NarrativeSection => self.narrative_section.clone(),
            FieldKey::NarrativeField => self.narrative_field.clone(),
            FieldKey::AcceptInvalidCerts => self.accept_invalid_certs.to_string(),
        }
    }

    /// Validate and store a field from its text form
    pub fn set_value(&mut self, key: FieldKey, value: &str) -> Result<(), String> {
        (key.field().validator)(value)?;
        let value = value.trim().to_string();

        match key {
            FieldKey::PwndocUrl => self.pwndoc_url = value,
            FieldKey::PwndocUsername => self.pwndoc_username = value,
            FieldKey::PwndocPassword => self.pwndoc_password = value,
            FieldKey::PwndocAuditName => self.pwndoc_audit_name = value,
            FieldKey::OutputDir => self.output_dir = value,
            FieldKey::ScoutSuiteReportsDir => self.scout_suite_reports_dir = value,
            FieldKey::AwsAccessKey => self.aws_access_key = value,
            FieldKey::AwsSecretKey => self.aws_secret_key = value,
            FieldKey::AwsToken => self.aws_token = value,
            FieldKey::NarrativeSection => self.narrative_section = value,
            FieldKey::NarrativeField => self.narrative_field = value,
            FieldKey::AcceptInvalidCerts => self.accept_invalid_certs = fields::parse_bool(&value)?,
        }
        Ok(())
    }

    /// Report root with `~/` expanded
    pub fn reports_dir(&self) -> PathBuf {
        expand_home(&self.scout_suite_reports_dir)
    }

    /// Output directory with `~/` expanded
    pub fn output_dir(&self) -> PathBuf {
        expand_home(&self.output_dir)
    }
}

/// Expand a leading `~/` (or a bare `~`) to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(path);
    };

    if path == "~" {
        home
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
