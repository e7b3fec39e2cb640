use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::Output;
use crate::config::WizardConfig;
use crate::engine::{
    AggregateProgress, Aggregator, EVENT_BUFFER, EventBus, Module, ModuleCatalog, ModuleDefinition,
    ModuleEvent, ModuleRunner, ProgressTrace,
};

#[derive(Args)]
pub struct RunArgs {
    /// Module id to run, repeatable; every module runs when omitted
    #[arg(short, long = "module", value_name = "ID")]
    pub modules: Vec<String>,

    /// Directory searched for report files instead of the configured one
    #[arg(short, long, value_name = "DIR")]
    pub reports: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Serialize)]
struct RunReport<'a> {
    reports: &'a Path,
    progress: AggregateProgress,
    modules: Vec<&'a Module>,
}

enum Format {
    Text,
    Json,
}

pub async fn execute(args: RunArgs, config_path: &Path, quiet: bool) -> Result<()> {
    let format = match args.format.to_lowercase().as_str() {
        "text" => Format::Text,
        "json" => Format::Json,
        other => anyhow::bail!("Unsupported format: {}. Use text or json", other),
    };

    let config = WizardConfig::load(config_path)?;
    let catalog = select_modules(&args.modules)?;
    let report_root = args.reports.unwrap_or_else(|| config.reports_dir());

    let mut aggregator = Aggregator::new(catalog);
    aggregator.start_run();
    let modules: Vec<ModuleDefinition> = aggregator
        .catalog()
        .selected()
        .map(|m| m.definition.clone())
        .collect();
    tracing::info!("Running {} modules against {}", modules.len(), report_root.display());

    let (tx, rx) = EventBus::channel(EVENT_BUFFER);
    let runner =
        ModuleRunner::new(tx, ProgressTrace::default()).spawn(modules, report_root.clone());

    // The channel closes once the runner and every worker have dropped their senders
    let aggregator = tokio::task::spawn_blocking(move || {
        for event in rx.iter() {
            match &event {
                ModuleEvent::Debug { message } => tracing::debug!("{}", message),
                ModuleEvent::Error { module, message } => tracing::warn!("{}: {}", module, message),
                _ => {}
            }
            aggregator.apply(event);
        }
        aggregator
    })
    .await
    .context("Event consumer failed")?;

    if runner.join().is_err() {
        anyhow::bail!("Module runner panicked");
    }

    let report = RunReport {
        reports: &report_root,
        progress: aggregator.progress(),
        modules: aggregator.catalog().selected().collect(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text(&report, &Output::new(quiet)),
    }
    Ok(())
}

/// Catalog with the requested ids selected, or every module when none are given
fn select_modules(ids: &[String]) -> Result<ModuleCatalog> {
    let mut catalog = ModuleCatalog::builtin();

    if ids.is_empty() {
        let names: Vec<String> = catalog.iter().map(|m| m.name.clone()).collect();
        for name in names {
            catalog.select(&name, true);
        }
        return Ok(catalog);
    }

    for id in ids {
        let name = catalog
            .find_by_id(id)
            .map(|m| m.name.clone())
            .with_context(|| {
                format!("Unknown module '{id}'. Run 'scoutdoc modules' to list them")
            })?;
        catalog.select(&name, true);
    }
    Ok(catalog)
}

fn print_text(report: &RunReport<'_>, output: &Output) {
    output.header(&format!("Results for {}", report.reports.display()));

    for module in &report.modules {
        if module.errored {
            output.error(&format!("{}: {}", module.name, module.status));
        } else if module.affected_assets.is_empty() {
            output.success(&format!("{}: no affected assets", module.name));
        } else {
            output.warning(&format!(
                "{}: {} affected assets",
                module.name,
                module.affected_assets.len()
            ));
        }
        for asset in &module.affected_assets {
            output.table_row(&asset.id, &asset.name);
        }
    }

    output.blank_line();
    output.info(&format!(
        "Checked {} of {} resources",
        report.progress.done, report.progress.total
    ));
}
