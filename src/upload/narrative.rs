//! Placeholder substitution for narratives and findings
//!
//! Substitutions are applied in a fixed order: the asset count, then the asset
//! list, then the screenshot embed.

use super::api::{NewFinding, Section, TemplateDetail, VulnerabilityTemplate};
use crate::engine::catalog::{AffectedAsset, NarrativeTokens};

/// Replacement values for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitutions<'a> {
    pub tokens: &'a NarrativeTokens,
    pub amount: String,
    pub assets: String,
    pub screenshot: String,
}

impl<'a> Substitutions<'a> {
    /// `image_id` is empty when no screenshot was uploaded
    pub fn new(
        tokens: &'a NarrativeTokens,
        module_name: &str,
        assets: &[AffectedAsset],
        image_id: &str,
    ) -> Self {
        Self {
            tokens,
            amount: assets.len().to_string(),
            assets: asset_list(assets),
            screenshot: if image_id.is_empty() {
                String::new()
            } else {
                screenshot_embed(image_id, module_name)
            },
        }
    }

    pub fn apply(&self, text: &str) -> String {
        let text = replace_token(text, self.tokens.amount, &self.amount);
        let text = replace_token(&text, self.tokens.assets, &self.assets);
        replace_token(&text, self.tokens.screenshot, &self.screenshot)
    }
}

fn replace_token(text: &str, token: &str, value: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, value)
    }
}

/// One HTML list item per asset, `name: id`
pub fn asset_list(assets: &[AffectedAsset]) -> String {
    assets
        .iter()
        .map(|asset| format!("<li><p>{}: {}</p></li>\n", asset.name, asset.id))
        .collect()
}

/// Closes the surrounding paragraph, embeds the image, reopens a paragraph
pub fn screenshot_embed(image_id: &str, alt: &str) -> String {
    format!("</p><img class=\"custom-image\" src=\"{image_id}\" alt=\"{alt}\"><p>")
}

pub fn proof_of_concept(image_id: &str, alt: &str) -> String {
    let mut poc = "<ul><li><p>The affected assets were identified in the ScoutSuite \
                   results:</p></li></ul>"
        .to_string();
    if !image_id.is_empty() {
        poc.push_str(&format!("<img class=\"custom-image\" src=\"{image_id}\" alt=\"{alt}\">"));
    }
    poc
}

/// Outcome of applying substitutions to one section
#[derive(Debug, Default, PartialEq)]
pub struct NarrativeUpdate {
    /// Fields that were rewritten
    pub updated: usize,
    /// Labels of matching fields whose text was not a string
    pub skipped: Vec<String>,
}

/// Rewrite every custom field labelled `field_label` in place
pub fn update_section(
    section: &mut Section,
    field_label: &str,
    subs: &Substitutions<'_>,
) -> NarrativeUpdate {
    let mut outcome = NarrativeUpdate::default();

    for field in section
        .custom_fields
        .iter_mut()
        .filter(|field| field.definition.label == field_label)
    {
        match field.text.as_str() {
            Some(text) => {
                let replaced = subs.apply(text);
                field.text = replaced.into();
                outcome.updated += 1;
            }
            None => outcome.skipped.push(field.definition.label.clone()),
        }
    }

    outcome
}

/// First template detail whose title matches exactly
pub fn find_template<'t>(
    templates: &'t [VulnerabilityTemplate],
    title: &str,
) -> Option<(&'t VulnerabilityTemplate, &'t TemplateDetail)> {
    templates.iter().find_map(|template| {
        template
            .details
            .iter()
            .find(|detail| detail.title == title)
            .map(|detail| (template, detail))
    })
}

pub fn build_finding(
    template: &VulnerabilityTemplate,
    detail: &TemplateDetail,
    subs: &Substitutions<'_>,
    poc: String,
) -> NewFinding {
    let text = |value: &Option<String>| subs.apply(value.as_deref().unwrap_or_default());

    NewFinding {
        title: detail.title.clone(),
        vuln_type: detail.vuln_type.clone(),
        description: text(&detail.description),
        observation: text(&detail.observation),
        remediation: detail.remediation.clone().unwrap_or_default(),
        references: detail.references.clone(),
        cvssv3: template.cvssv3.clone(),
        priority: template.priority.clone(),
        remediation_complexity: template.remediation_complexity.clone(),
        category: template.category.clone(),
        scope: subs.assets.clone(),
        poc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOKENS: NarrativeTokens = NarrativeTokens {
        amount: "%KEYS_AGE_AMOUNT%",
        assets: "%KEYS_AGE_ASSETS%",
        screenshot: "%KEYS_AGE_SCREENSHOT%",
    };

    fn assets() -> Vec<AffectedAsset> {
        vec![AffectedAsset::new("AKIA1", "alice"), AffectedAsset::new("AKIA2", "bob")]
    }

    #[test]
    fn test_asset_list_format() {
        assert_eq!(
            asset_list(&assets()),
            "<li><p>alice: AKIA1</p></li>\n<li><p>bob: AKIA2</p></li>\n"
        );
        assert_eq!(asset_list(&[]), "");
    }

    #[test]
    fn test_substitutions_are_layered() {
        let subs = Substitutions::new(&TOKENS, "Access Key Age/Last Used", &assets(), "img42");
        let text =
            "<p>%KEYS_AGE_AMOUNT% keys:</p><ul>%KEYS_AGE_ASSETS%</ul><p>%KEYS_AGE_SCREENSHOT%</p>";

        assert_eq!(
            subs.apply(text),
            "<p>2 keys:</p><ul><li><p>alice: AKIA1</p></li>\n<li><p>bob: AKIA2</p></li>\n</ul>\
             <p></p><img class=\"custom-image\" src=\"img42\" \
             alt=\"Access Key Age/Last Used\"><p></p>"
        );
    }

    #[test]
    fn test_missing_screenshot_removes_token() {
        let subs = Substitutions::new(&TOKENS, "m", &assets(), "");
        assert_eq!(subs.apply("a%KEYS_AGE_SCREENSHOT%b"), "ab");
        assert!(!proof_of_concept("", "m").contains("<img"));
    }

    #[test]
    fn test_update_section_only_touches_labelled_strings() {
        let mut section: Section = serde_json::from_value(json!({
            "_id": "s1",
            "name": "Cloud",
            "customFields": [
                {"customField": {"label": "Cloud Narrative"}, "text": "Found %KEYS_AGE_AMOUNT%"},
                {"customField": {"label": "Other"}, "text": "Found %KEYS_AGE_AMOUNT%"},
                {"customField": {"label": "Cloud Narrative"}, "text": ["not", "text"]}
            ]
        }))
        .unwrap();

        let subs = Substitutions::new(&TOKENS, "m", &assets(), "");
        let outcome = update_section(&mut section, "Cloud Narrative", &subs);

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.skipped, vec!["Cloud Narrative".to_string()]);
        assert_eq!(section.custom_fields[0].text, json!("Found 2"));
        assert_eq!(section.custom_fields[1].text, json!("Found %KEYS_AGE_AMOUNT%"));
    }

    #[test]
    fn test_build_finding_from_template() {
        let templates: Vec<VulnerabilityTemplate> = serde_json::from_value(json!([
            {"details": [{"title": "Something else"}]},
            {
                "cvssv3": "CVSS:3.0/AV:N",
                "category": "Cloud",
                "details": [{
                    "title": "Access Keys Older than 90 Days",
                    "description": "%KEYS_AGE_AMOUNT% keys are old",
                    "observation": "<ul>%KEYS_AGE_ASSETS%</ul>",
                    "remediation": "Rotate keys",
                    "references": ["https://docs.aws.amazon.com"]
                }]
            }
        ]))
        .unwrap();

        let (template, detail) =
            find_template(&templates, "Access Keys Older than 90 Days").unwrap();
        let subs = Substitutions::new(&TOKENS, "m", &assets(), "img1");
        let finding = build_finding(template, detail, &subs, proof_of_concept("img1", "m"));

        assert_eq!(finding.description, "2 keys are old");
        assert!(finding.observation.contains("<li><p>alice: AKIA1</p></li>"));
        assert_eq!(finding.scope, asset_list(&assets()));
        assert_eq!(finding.cvssv3.as_deref(), Some("CVSS:3.0/AV:N"));
        assert!(finding.poc.contains("src=\"img1\""));
        assert!(find_template(&templates, "Missing").is_none());
    }
}
