//! Pwndoc upload pipeline
//!
//! Consumes the final module state of a run. For every selected module with
//! affected assets it renders and uploads a screenshot, fills the narrative
//! placeholders of the configured audit section and creates a finding from
//! the matching vulnerability template. Progress is reported as Debug events;
//! failures are logged and do not stop the remaining steps.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

pub mod api;
pub mod client;
pub mod dump;
pub mod narrative;
pub mod screenshot;

pub use api::{ApiReply, ReportingApi};
pub use client::PwndocClient;
pub use dump::ResponseDump;
pub use screenshot::ScreenshotRenderer;

use crate::config::WizardConfig;
use crate::engine::{EventSender, Module};
use api::{AuditSummary, ImageUpload, UploadedImage, VulnerabilityTemplate};
use narrative::Substitutions;

/// Counts reported once the pipeline finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub modules: usize,
    pub screenshots: usize,
    pub narratives: usize,
    pub findings: usize,
    pub failures: usize,
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Uploaded {} modules: {} screenshots, {} narrative fields, {} findings, {} failures",
            self.modules, self.screenshots, self.narratives, self.findings, self.failures
        )
    }
}

pub struct UploadPipeline<A: ReportingApi> {
    api: A,
    config: WizardConfig,
    events: EventSender,
    renderer: Option<ScreenshotRenderer>,
    dump: ResponseDump,
}

impl<A: ReportingApi> UploadPipeline<A> {
    pub fn new(api: A, config: WizardConfig, events: EventSender) -> Self {
        let dump = ResponseDump::new(&config.output_dir());
        Self {
            api,
            config,
            events,
            renderer: ScreenshotRenderer::locate(),
            dump,
        }
    }

    pub fn with_renderer(mut self, renderer: Option<ScreenshotRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn run(&self, modules: &[Module]) -> Result<UploadSummary> {
        let mut summary = UploadSummary::default();
        self.events.debug("Uploading results to Pwndoc");

        let audit = self.select_audit().await?;
        self.events
            .debug(format!("Using audit {} ({})", audit.name, audit.id));

        let pending: Vec<&Module> = modules
            .iter()
            .filter(|m| m.selected && !m.affected_assets.is_empty())
            .collect();
        if pending.is_empty() {
            self.events.debug("No affected assets to upload");
            return Ok(summary);
        }

        let templates = match self.api.export_vulnerability_templates().await {
            Ok(templates) => Some(templates),
            Err(e) => {
                let reason = format!("Unable to export vulnerability templates: {e:#}");
                self.failure(&mut summary, reason);
                None
            }
        };

        for module in pending {
            summary.modules += 1;

            let image_id = match self.upload_screenshot(&audit, module).await {
                Ok(Some(id)) => {
                    summary.screenshots += 1;
                    self.events.debug(format!("Screenshot uploaded: {id}"));
                    id
                }
                Ok(None) => String::new(),
                Err(e) => {
                    let reason = format!("Screenshot for {} failed: {e:#}", module.name);
                    self.failure(&mut summary, reason);
                    String::new()
                }
            };

            let subs = Substitutions::new(
                &module.definition.tokens,
                &module.name,
                &module.affected_assets,
                &image_id,
            );

            match self.upload_narrative(&audit.id, &subs).await {
                Ok(updated) => summary.narratives += updated,
                Err(e) => {
                    let reason = format!("Narrative for {} failed: {e:#}", module.name);
                    self.failure(&mut summary, reason);
                }
            }

            if let Some(templates) = &templates {
                match self.create_finding(&audit.id, module, templates, &subs, &image_id).await {
                    Ok(true) => summary.findings += 1,
                    Ok(false) => summary.failures += 1,
                    Err(e) => {
                        let reason = format!("Finding for {} failed: {e:#}", module.name);
                        self.failure(&mut summary, reason);
                    }
                }
            }
        }

        tracing::info!(
            "Upload finished: {} narratives, {} findings, {} failures",
            summary.narratives,
            summary.findings,
            summary.failures
        );
        self.events.debug(format!(
            "Upload finished: {} narrative fields, {} findings, {} failures",
            summary.narratives, summary.findings, summary.failures
        ));
        Ok(summary)
    }

    async fn select_audit(&self) -> Result<AuditSummary> {
        let audits = self
            .api
            .get_audits()
            .await
            .context("Unable to retrieve audits")?;

        audits
            .into_iter()
            .find(|audit| audit.name == self.config.pwndoc_audit_name)
            .with_context(|| format!("No audit named '{}'", self.config.pwndoc_audit_name))
    }

    /// Some(image id) once uploaded, None when no renderer is installed
    async fn upload_screenshot(
        &self,
        audit: &AuditSummary,
        module: &Module,
    ) -> Result<Option<String>> {
        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let stem = module.definition.screenshot_stem;
        let input = output_dir.join(format!("{stem}.json"));
        screenshot::write_assets(&input, &module.affected_assets)?;

        let Some(renderer) = &self.renderer else {
            self.events.debug(format!(
                "{} not found, skipping screenshot for {}",
                screenshot::RENDERER,
                module.name
            ));
            return Ok(None);
        };

        let image = output_dir.join(format!("{stem}.png"));
        renderer.render(&input, &image).await?;
        let png = tokio::fs::read(&image)
            .await
            .with_context(|| format!("Failed to read screenshot: {}", image.display()))?;

        let body = serde_json::to_value(ImageUpload {
            value: screenshot::png_data_uri(&png),
            name: format!("{stem}.png"),
            audit_id: audit.id.clone(),
        })?;
        let reply = self.api.post_json("/api/images", &body).await?;
        self.check_reply(&format!("image-{stem}"), &reply)?;

        let uploaded: UploadedImage = reply.datas()?;
        Ok(Some(uploaded.id))
    }

    /// Returns the number of narrative fields updated
    async fn upload_narrative(&self, audit_id: &str, subs: &Substitutions<'_>) -> Result<usize> {
        let audit = self.api.get_audit(audit_id).await?;
        let section_name = &self.config.narrative_section;
        let field_label = &self.config.narrative_field;
        let mut updated = 0;

        for mut section in audit.sections.into_iter().filter(|s| &s.name == section_name) {
            let outcome = narrative::update_section(&mut section, field_label, subs);
            for label in outcome.skipped {
                self.events.debug(format!(
                    "Field '{label}' in section '{}' is not text, skipped",
                    section.name
                ));
            }
            if outcome.updated == 0 {
                continue;
            }

            let path = format!("/api/audits/{audit_id}/sections/{}", section.id);
            self.events.debug(format!("Updating narrative at {path}"));
            let body = serde_json::to_value(&section)?;
            let reply = self.api.put_json(&path, &body).await?;
            self.check_reply(&format!("section-{}", section.name), &reply)?;
            updated += outcome.updated;
        }

        if updated == 0 {
            self.events.debug(format!(
                "No '{field_label}' field found in section '{section_name}'"
            ));
        }
        Ok(updated)
    }

    /// False when no template matches the module's finding title
    async fn create_finding(
        &self,
        audit_id: &str,
        module: &Module,
        templates: &[VulnerabilityTemplate],
        subs: &Substitutions<'_>,
        image_id: &str,
    ) -> Result<bool> {
        let title = module.definition.finding_template;
        let Some((template, detail)) = narrative::find_template(templates, title) else {
            let message = format!("No vulnerability template titled '{title}'");
            tracing::warn!("{}", message);
            self.events.debug(message);
            return Ok(false);
        };

        let alt = format!("{}.png", module.definition.screenshot_stem);
        let poc = narrative::proof_of_concept(image_id, &alt);
        let finding = narrative::build_finding(template, detail, subs, poc);
        self.events
            .debug(format!("Creating finding '{}' for {}", finding.title, module.name));

        let reply = self
            .api
            .post_json(
                &format!("/api/audits/{audit_id}/findings"),
                &serde_json::to_value(&finding)?,
            )
            .await?;
        self.check_reply(&format!("finding-{}", module.definition.id), &reply)?;
        Ok(true)
    }

    /// Dump the body, then fail on a non-2xx status
    fn check_reply(&self, label: &str, reply: &ApiReply) -> Result<()> {
        match self.dump.write(label, &reply.body) {
            Ok(path) => tracing::debug!("Response for {} saved to {}", label, path.display()),
            Err(e) => {
                tracing::warn!("{:#}", e);
                self.events.debug(format!("{e:#}"));
            }
        }

        if !reply.is_success() {
            anyhow::bail!(
                "HTTP {}: {}",
                reply.status,
                String::from_utf8_lossy(&reply.body)
            );
        }
        Ok(())
    }

    fn failure(&self, summary: &mut UploadSummary, message: String) {
        tracing::warn!("{}", message);
        self.events.debug(message);
        summary.failures += 1;
    }
}
