//! Module runner
//!
//! Discovers report files once, then starts one OS thread per selected module.
//! Workers communicate only through the [`EventSender`]; every failure becomes
//! an Error event and the worker keeps going where it can.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::catalog::{AffectedAsset, ModuleDefinition, ModuleProcedure};
use super::events::EventSender;
use super::extractor::{count_affected, find_affected, resolve_field, resource_query};
use super::trace::ProgressTrace;
use crate::report::{self, Query, ReportDocument};

/// Line written to the progress trace for every simulated iteration
const TRACE_LINE: &str = "Sending progress message";

pub struct ModuleRunner {
    events: EventSender,
    trace: ProgressTrace,
    simulated_delay: Option<Duration>,
}

impl ModuleRunner {
    pub fn new(events: EventSender, trace: ProgressTrace) -> Self {
        Self {
            events,
            trace,
            simulated_delay: None,
        }
    }

    /// Override the per-iteration delay of simulated modules
    pub fn with_simulated_delay(mut self, delay: Duration) -> Self {
        self.simulated_delay = Some(delay);
        self
    }

    /// Run in the background; the handle finishes once every worker has
    pub fn spawn(self, modules: Vec<ModuleDefinition>, report_root: PathBuf) -> JoinHandle<()> {
        thread::spawn(move || self.run(&modules, &report_root))
    }

    /// Discover reports, run every module to completion and wait for the workers
    pub fn run(&self, modules: &[ModuleDefinition], report_root: &Path) {
        self.events
            .debug(format!("about to walk: {}", report_root.display()));
        let discovery = report::discover_reports(report_root);
        for error in discovery.errors {
            self.events.debug(error);
        }
        self.events
            .debug(format!("Found {} reports", discovery.reports.len()));

        let reports = Arc::new(discovery.reports);
        let workers: Vec<JoinHandle<()>> = modules
            .iter()
            .filter_map(|module| self.spawn_worker(module.clone(), Arc::clone(&reports)))
            .collect();

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Module worker panicked");
            }
        }
    }

    fn spawn_worker(
        &self,
        module: ModuleDefinition,
        reports: Arc<Vec<PathBuf>>,
    ) -> Option<JoinHandle<()>> {
        let events = self.events.clone();
        let trace = self.trace.clone();
        let delay_override = self.simulated_delay;
        let name = module.name;

        let spawned = thread::Builder::new()
            .name(format!("module-{}", module.id))
            .spawn(move || match module.procedure {
                ModuleProcedure::ReportScan {
                    finding_query,
                    id_field,
                    name_field,
                } => {
                    let scan = ReportScan {
                        events: &events,
                        module: name,
                        finding_query,
                        id_field,
                        name_field,
                    };
                    scan.run(&reports);
                }
                ModuleProcedure::Simulated { iterations, delay } => {
                    let delay = delay_override.unwrap_or(delay);
                    run_simulated(&events, &trace, name, iterations, delay);
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start worker for {}: {}", name, e);
                self.events.error(name, format!("could not start worker: {e}"));
                self.events.complete(name);
                None
            }
        }
    }
}

/// Load every report, skipping the ones that fail
pub fn load_reports(events: &EventSender, paths: &[PathBuf]) -> Vec<ReportDocument> {
    let mut documents = Vec::with_capacity(paths.len());

    for path in paths {
        events.debug(format!("Processing file: {}", path.display()));
        match report::load(path) {
            Ok(document) => documents.push(document),
            Err(e) => {
                tracing::warn!("{}", e);
                events.debug(e.to_string());
            }
        }
    }

    events.debug(format!(
        "Finished processing {} reports ({} loaded)",
        paths.len(),
        documents.len()
    ));
    documents
}

struct ReportScan<'a> {
    events: &'a EventSender,
    module: &'a str,
    finding_query: &'a str,
    id_field: &'a str,
    name_field: &'a str,
}

impl ReportScan<'_> {
    fn run(&self, paths: &[PathBuf]) {
        self.events.debug(format!("Running module {}", self.module));
        let documents = load_reports(self.events, paths);

        let query = match Query::parse(self.finding_query) {
            Ok(query) => query,
            Err(e) => {
                self.events.error(self.module, format!("finding query: {e}"));
                self.events.complete(self.module);
                return;
            }
        };

        let mut checked = 0;
        let mut total = 0;

        for (position, document) in documents.iter().enumerate() {
            let report_name = document.display_name();
            self.events.debug(format!(
                "Checking report number {} of {}: {}",
                position + 1,
                documents.len(),
                report_name
            ));

            let count = match count_affected(document, &query) {
                Ok(count) => count,
                Err(e) => {
                    self.events.error(self.module, format!("{report_name}: {e}"));
                    continue;
                }
            };
            total += count;
            if !self
                .events
                .progress(self.module, checked, total, format!("Counting {report_name}"))
            {
                return;
            }

            let found = match find_affected(document, &query) {
                Ok(found) => found,
                Err(e) => {
                    self.events.error(self.module, format!("{report_name}: {e}"));
                    continue;
                }
            };
            for anomaly in found.anomalies {
                self.events.error(self.module, format!("{report_name}: {anomaly}"));
            }

            for reference in &found.references {
                let id = self.resolve(document, reference, self.id_field);
                let owner = self.resolve(document, reference, self.name_field);
                checked += 1;

                self.events
                    .progress(self.module, checked, total.max(checked), format!("Checking {id}"));
                if !self.events.affected(self.module, AffectedAsset::new(id, owner)) {
                    return;
                }
            }

            self.events.debug(format!(
                "Affected assets in {}: {}",
                report_name,
                found.references.len()
            ));
        }

        self.events.complete(self.module);
    }

    fn resolve(&self, document: &ReportDocument, reference: &str, field: &str) -> String {
        let path = resource_query(reference, field);
        self.events.debug(format!("Transformed path: {path}"));

        resolve_field(document, &path).unwrap_or_else(|e| {
            self.events.error(self.module, e.to_string());
            String::new()
        })
    }
}

fn run_simulated(
    events: &EventSender,
    trace: &ProgressTrace,
    module: &str,
    iterations: usize,
    delay: Duration,
) {
    events.debug(format!("Running module {module}"));

    for checked in 1..=iterations {
        thread::sleep(delay);
        if let Err(e) = trace.append(TRACE_LINE) {
            events.error(module, format!("{e:#}"));
        }
        if !events.progress(
            module,
            checked,
            iterations,
            format!("Checked bucket {checked} of {iterations}"),
        ) {
            return;
        }
    }

    events.complete(module);
}
