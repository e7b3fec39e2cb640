//! Declarative descriptors for every configuration field
//!
//! The wizard form, `config validate` and [`WizardConfig::set_value`] are all
//! driven from [`FIELDS`].
//!
//! [`WizardConfig::set_value`]: super::WizardConfig::set_value

use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_PWNDOC_URL: &str = "https://localhost:8443";
pub const DEFAULT_OUTPUT_DIR: &str = "~/scoutdoc/outputs";
pub const DEFAULT_REPORTS_DIR: &str = "~/scoutdoc/scout";
pub const DEFAULT_NARRATIVE_SECTION: &str = "Cloud";
pub const DEFAULT_NARRATIVE_FIELD: &str = "Cloud Narrative";

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"^https?://[^\s/:]+(:\d{1,5})?(/\S*)?$").expect("URL pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    PwndocUrl,
    PwndocUsername,
    PwndocPassword,
    PwndocAuditName,
    OutputDir,
    ScoutSuiteReportsDir,
    AwsAccessKey,
    AwsSecretKey,
    AwsToken,
    NarrativeSection,
    NarrativeField,
    AcceptInvalidCerts,
}

impl FieldKey {
    /// JSON key of the field
    pub fn as_str(self) -> &'static str {
        self.field().key_name
    }

    pub fn field(self) -> &'static ConfigField {
        // FIELDS holds exactly one descriptor per key, in declaration order
        &FIELDS[self as usize]
    }
}

/// One configurable value
#[derive(Debug)]
pub struct ConfigField {
    pub key: FieldKey,
    pub key_name: &'static str,
    pub label: &'static str,
    pub default: &'static str,
    pub validator: fn(&str) -> Result<(), String>,
    /// Masked while editing
    pub secret: bool,
}

pub static FIELDS: &[ConfigField] = &[
    ConfigField {
        key: FieldKey::PwndocUrl,
        key_name: "pwndoc_url",
        label: "Pwndoc URL",
        default: DEFAULT_PWNDOC_URL,
        validator: validate_url,
        secret: false,
    },
    ConfigField {
        key: FieldKey::PwndocUsername,
        key_name: "pwndoc_username",
        label: "Pwndoc username",
        default: "",
        validator: any_value,
        secret: false,
    },
    ConfigField {
        key: FieldKey::PwndocPassword,
        key_name: "pwndoc_password",
        label: "Pwndoc password",
        default: "",
        validator: any_value,
        secret: true,
    },
    ConfigField {
        key: FieldKey::PwndocAuditName,
        key_name: "pwndoc_audit_name",
        label: "Pwndoc audit name",
        default: "",
        validator: any_value,
        secret: false,
    },
    ConfigField {
        key: FieldKey::OutputDir,
        key_name: "output_dir",
        label: "Output directory",
        default: DEFAULT_OUTPUT_DIR,
        validator: validate_path,
        secret: false,
    },
    ConfigField {
        key: FieldKey::ScoutSuiteReportsDir,
        key_name: "scout_suite_reports_dir",
        label: "ScoutSuite reports directory",
        default: DEFAULT_REPORTS_DIR,
        validator: validate_path,
        secret: false,
    },
    ConfigField {
        key: FieldKey::AwsAccessKey,
        key_name: "aws_access_key",
        label: "AWS access key",
        default: "",
        validator: any_value,
        secret: false,
    },
    ConfigField {
        key: FieldKey::AwsSecretKey,
        key_name: "aws_secret_key",
        label: "AWS secret key",
        default: "",
        validator: any_value,
        secret: true,
    },
    ConfigField {
        key: FieldKey::AwsToken,
        key_name: "aws_token",
        label: "AWS session token",
        default: "",
        validator: any_value,
        secret: true,
    },
    ConfigField {
        key: FieldKey::NarrativeSection,
        key_name: "narrative_section",
        label: "Narrative section",
        default: DEFAULT_NARRATIVE_SECTION,
        validator: required,
        secret: false,
    },
    ConfigField {
        key: FieldKey::NarrativeField,
        key_name: "narrative_field",
        label: "Narrative field label",
        default: DEFAULT_NARRATIVE_FIELD,
        validator: required,
        secret: false,
    },
    ConfigField {
        key: FieldKey::AcceptInvalidCerts,
        key_name: "accept_invalid_certs",
        label: "Accept invalid certificates",
        default: "false",
        validator: validate_bool,
        secret: false,
    },
];

fn any_value(_: &str) -> Result<(), String> {
    Ok(())
}

fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("a value is required".to_string());
    }
    Ok(())
}

fn validate_url(value: &str) -> Result<(), String> {
    if URL_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(format!("'{}' is not an http(s) URL", value.trim()))
    }
}

fn validate_path(value: &str) -> Result<(), String> {
    required(value)?;
    if value.contains('\0') {
        return Err("paths cannot contain NUL bytes".to_string());
    }
    Ok(())
}

fn validate_bool(value: &str) -> Result<(), String> {
    parse_bool(value).map(|_| ())
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        other => Err(format!("'{other}' is not true or false")),
    }
}
